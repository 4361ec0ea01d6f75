//! Streaming speech-to-text client
//!
//! Full-duplex WebSocket transport for a streaming STT vendor:
//! - Connection pool keyed by (api key, language, model), with prewarm
//! - PCM16 framing into 100 ms base64 chunks
//! - Reconnection with bounded attempts; close is idempotent and terminal
//! - Transcript and VAD event demultiplexing

pub mod pool;
pub mod protocol;
pub mod stream;

pub use pool::{PoolKey, PooledSocket, SttSessionConfig, WsPool};
pub use protocol::{demux, SttEvent, TranscriptEvent, VadEvent};
pub use stream::{ReconnectDecision, ReconnectPolicy, SttStream};

use thiserror::Error;

/// STT client errors
#[derive(Error, Debug)]
pub enum SttError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Connect timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Stream closed")]
    Closed,

    #[error("Invalid session config: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SttError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SttError::Send(err.to_string())
    }
}

impl From<SttError> for vaani_core::Error {
    fn from(err: SttError) -> Self {
        match err {
            SttError::Connect(msg) | SttError::Send(msg) => {
                vaani_core::Error::TransientNetwork(msg)
            }
            SttError::ConnectTimeout(ms) => {
                vaani_core::Error::TransientNetwork(format!("STT connect timeout after {} ms", ms))
            }
            SttError::Closed => vaani_core::Error::Internal("STT stream closed".to_string()),
            SttError::Config(msg) => vaani_core::Error::Config(msg),
        }
    }
}
