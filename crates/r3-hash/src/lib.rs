//! SHA-256 hashing and the restricted ignore-pattern file walk shared by
//! every layer of a repository that needs content identity.

mod error;
pub mod hasher;
pub mod hex;
pub mod walk;

pub use error::HashError;
pub use hasher::{hash_file, hash_str, Hasher};
pub use walk::find_files;
