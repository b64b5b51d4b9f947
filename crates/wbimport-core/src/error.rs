use thiserror::Error;
use wbimport_model::EntityId;

/// Failure talking to the remote source. An empty answer is not an error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote API error {code}: {info}")]
    Api { code: String, info: String },
    #[error("failed to decode remote response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write clashes with an existing entity, named when known.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        existing: Option<EntityId>,
    },
    #[error("entity {0} not found")]
    NotFound(EntityId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("back-reference property {sentinel} could not be created or resolved: {source}")]
    Bootstrap {
        sentinel: EntityId,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
