//! Error types
//!
//! Two layers: `StorageError` for the local persisted state and `RecallError`
//! for everything the library surfaces. The prompt handler is the only place
//! that swallows them.

use thiserror::Error;

/// Failures of the local persisted-state store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("state database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::Io(io) => StorageError::IoError(io),
            other => StorageError::Database(other.to_string()),
        }
    }
}

/// Library-level error.
#[derive(Debug, Error)]
pub enum RecallError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("remote request failed: {0}")]
    RemoteRequestFailed(String),

    #[error("remote returned {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("remote response could not be decoded: {0}")]
    RemoteDecode(String),

    #[error("invalid hook input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for RecallError {
    fn from(err: config::ConfigError) -> Self {
        RecallError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for RecallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RecallError::RemoteDecode(err.to_string())
        } else {
            RecallError::RemoteRequestFailed(err.to_string())
        }
    }
}

impl RecallError {
    /// Whether a later attempt could succeed without any local change.
    pub fn is_retryable(&self) -> bool {
        match self {
            RecallError::ConfigError(_) => false,
            RecallError::InvalidInput(_) => false,
            RecallError::RemoteStatus { status, .. } => *status == 429 || *status >= 500,
            _ => true,
        }
    }

    /// Whether the service itself looks unreachable or overloaded, as opposed
    /// to rejecting one particular request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            RecallError::RemoteRequestFailed(_) => true,
            RecallError::RemoteStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
