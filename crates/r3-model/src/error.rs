/// Errors produced by the dependency and job model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("dependency must set exactly one of job/repository/query/query_all, got {0}")]
    InvalidDependencyKind(String),

    #[error("cannot hash an unresolved dependency ({0})")]
    HashUnresolved(&'static str),

    #[error("git dependency URL not recognised: {0}")]
    UnrecognisedUrl(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Hash(#[from] r3_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
