/// Errors produced by the source-control adapter.
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
