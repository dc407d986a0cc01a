use std::path::PathBuf;

/// Errors produced by the on-disk storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("path already exists: {0}")]
    PathExists(PathBuf),

    #[error("not a repository (no r3.yaml): {0}")]
    NotARepository(PathBuf),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("dependency is not resolved and cannot be checked out")]
    UnresolvedDependency,

    #[error(transparent)]
    Model(#[from] r3_model::ModelError),

    #[error(transparent)]
    Scm(#[from] r3_scm::ScmError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
