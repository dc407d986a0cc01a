/// The umbrella error type surfaced by the repository facade (§7). Every
/// subordinate crate's error enum is wrapped in through `#[from]`; the
/// facade-level variants name the concerns that only exist at this layer
/// (query resolution, dependency checking, removal safety).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("query matched no jobs: \"{0}\"")]
    Unresolvable(String),

    #[error("invalid query (every token must start with '#'): \"{0}\"")]
    InvalidQuery(String),

    #[error("job {job} has dependents and cannot be removed: {dependents:?}")]
    HasDependents { job: String, dependents: Vec<String> },

    #[error(transparent)]
    Storage(#[from] r3_storage::StorageError),

    #[error(transparent)]
    Index(#[from] r3_index::IndexError),

    #[error(transparent)]
    Model(#[from] r3_model::ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
