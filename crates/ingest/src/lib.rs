//! Knowledge ingestion pipeline
//!
//! File → structured elements → strategy-chunked text → content-hash keys →
//! idempotent upsert into the agent's vector namespace. Re-running on an
//! unchanged file is a no-op.

pub mod chunking;
pub mod orchestrator;
pub mod parser;

pub use chunking::{ChunkStrategy, ChunkingService, TextChunk};
pub use orchestrator::{IngestOptions, IngestReport, IngestionPipeline};
pub use parser::{
    DocumentParser, ElementType, ParsedDocument, ParserConfig, StructuredElement,
};

use thiserror::Error;

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Remote parser error: {0}")]
    RemoteParser(String),

    #[error("Tokenizer error: {0}")]
    Text(#[from] vaani_text::TextError),

    #[error("Index error: {0}")]
    Index(#[from] vaani_rag::RagError),

    #[error("Store error: {0}")]
    Store(#[from] vaani_persistence::PersistenceError),
}

impl From<IngestError> for vaani_core::Error {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Io(e) => vaani_core::Error::Internal(e.to_string()),
            IngestError::Parse(msg) => vaani_core::Error::Validation(msg),
            IngestError::RemoteParser(msg) => vaani_core::Error::TransientNetwork(msg),
            IngestError::Text(e) => e.into(),
            IngestError::Index(e) => e.into(),
            IngestError::Store(e) => e.into(),
        }
    }
}
