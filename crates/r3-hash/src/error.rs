/// Errors produced by hashing and the restricted ignore-pattern file walk.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidHex { position: usize, character: char },

    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("ignore pattern '{0}' must start with '/'")]
    UnsupportedIgnorePattern(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
