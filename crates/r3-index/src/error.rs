/// Errors produced by the index sidecar.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Model(#[from] r3_model::ModelError),

    #[error(transparent)]
    Util(#[from] r3_utils::UtilError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
