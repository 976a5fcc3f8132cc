use thiserror::Error;

/// Hard failures of the store. Recoverable API failures never take this
/// path; they land in [`crate::entities::ErrorLog`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown action tag `{0}`")]
    UnknownAction(String),
    #[error("invalid payload for action `{tag}`: {source}")]
    InvalidPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store event queue closed")]
    QueueClosed,
}

#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("key/value storage io failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("key/value storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
