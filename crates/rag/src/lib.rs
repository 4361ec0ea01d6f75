//! RAG retrieval layer
//!
//! Features:
//! - Namespace-scoped vector index (one namespace per agent)
//! - Pluggable backends: in-memory for tests, Qdrant for production
//! - Key-idempotent adds, threshold-filtered search, warmup probes
//! - Voice-latency facade with query expansion, result caching, and
//!   hybrid item + knowledge search

pub mod backend;
pub mod embeddings;
pub mod index;
pub mod knowledge;
pub mod memory_backend;
pub mod qdrant_backend;
pub mod query_expansion;
pub mod result_cache;

pub use backend::{BackendEntry, BackendHit, EntryPage, KeyRef, NamespaceClear, VectorBackend};
pub use embeddings::{Embedder, HashEmbedder, HttpEmbedder, HttpEmbedderConfig};
pub use index::{
    AddRequest, AddStatus, ChunkContext, EntryOut, ListRequest, RagIndex, ScoredRef,
    SearchRequest, SearchResponse, WarmupReport,
};
pub use knowledge::{
    BusinessInfoType, HybridOptions, HybridResponse, KnowledgeAccessLog, OrgInfoProvider,
    SearchSource, VoiceKnowledgeService, VoiceSearchConfig, VoiceSearchResponse,
};
pub use memory_backend::MemoryVectorBackend;
pub use qdrant_backend::{QdrantBackend, QdrantBackendConfig};
pub use query_expansion::{expand_query, threshold_for, ExpandedQuery, InfoType};
pub use result_cache::ResultCache;

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for vaani_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::NotFound(msg) => vaani_core::Error::NotFound(msg),
            RagError::Connection(msg) | RagError::Embedding(msg) => {
                vaani_core::Error::TransientNetwork(msg)
            }
            other => vaani_core::Error::Internal(other.to_string()),
        }
    }
}
