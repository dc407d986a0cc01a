/// Base error type for r3-utils operations.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
