use thiserror::Error;

/// Errors produced by the on-disk chunk store.
///
/// `SessionNotFound` and `NoChunksAvailable` are caller-recoverable and are
/// surfaced distinctly so the HTTP layer can map them to 404 instead of a
/// generic server error. Everything else propagates with its diagnostic
/// detail attached.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("recording session not found: {0}")]
    SessionNotFound(String),

    #[error("chunk payload is empty")]
    EmptyPayload,

    #[error("no chunks available for session: {0}")]
    NoChunksAvailable(String),

    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata record is unreadable: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
