//! The dependency and job model: the four dependency kinds, their
//! serialisation and content hashing, and the in-memory `Job` type.

mod dependency;
mod error;
mod job;

pub use dependency::{
    repository_path, Dependency, GitDependency, JobDependency, QueryAllDependency,
    QueryDependency,
};
pub use error::ModelError;
pub use job::{
    format_system_time, Datetime, Job, JobConfig, Metadata, MANIFEST_FILE, METADATA_FILE,
    OUTPUT_DIR,
};
