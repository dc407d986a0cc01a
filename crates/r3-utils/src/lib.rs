pub mod error;
pub mod perms;
pub mod tempfile;

pub use error::UtilError;

pub type Result<T> = std::result::Result<T, UtilError>;
