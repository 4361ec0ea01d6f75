//! Persistence errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC {path} failed: {message}")]
    Rpc { path: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        PersistenceError::Transport(err.to_string())
    }
}

impl From<PersistenceError> for vaani_core::Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Transport(msg) => vaani_core::Error::TransientNetwork(msg),
            PersistenceError::NotFound(msg) => vaani_core::Error::NotFound(msg),
            PersistenceError::Conflict(msg) => vaani_core::Error::Validation(msg),
            other => vaani_core::Error::Internal(other.to_string()),
        }
    }
}
