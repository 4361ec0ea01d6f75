//! Shared error taxonomy
//!
//! Leaf crates define their own `thiserror` enums and convert into this type
//! at crate boundaries. Orchestrators match on the variant to decide whether
//! an operation is retryable.

use thiserror::Error;

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration. Surfaced to the operator, never retried.
    #[error("Config error: {0}")]
    Config(String),

    /// A referenced entity (agent, document, integration) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad caller input (phone format, unknown enum value, invalid plugin config).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Timeout, connection reset, or 5xx from an upstream. Retryable with backoff.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// 4xx from an external service. Not retryable; the message is surfaced.
    #[error("Upstream rejected request: {0}")]
    UpstreamReject(String),

    /// A cascade step failed mid-flight. Fatal to the operation; the step
    /// number allows a resume from the failed table.
    #[error("Integrity failure at step {step}: {message}")]
    Integrity { step: usize, message: String },

    /// Connection pool exhausted or quota exceeded. Retryable after backoff.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The BPE encoding table could not be loaded.
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a caller may retry the failed operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransientNetwork(_) | Error::ResourceExhausted(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::TransientNetwork("timeout".into()).is_retryable());
        assert!(Error::ResourceExhausted("pool empty".into()).is_retryable());
        assert!(!Error::Validation("bad phone".into()).is_retryable());
        assert!(!Error::UpstreamReject("401".into()).is_retryable());
        assert!(!Error::Integrity {
            step: 4,
            message: "documents".into()
        }
        .is_retryable());
    }
}
