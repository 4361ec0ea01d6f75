//! Chunk access bookkeeping
//!
//! Adapter that lets the knowledge facade record retrieval hits into the
//! `chunkAccessLog` table. Strictly best-effort: a failed write never
//! fails a search.

use async_trait::async_trait;

use vaani_persistence::DocumentStore;
use vaani_rag::KnowledgeAccessLog;

/// Persistence-backed access sink
pub struct ChunkAccessRecorder {
    documents: DocumentStore,
}

impl ChunkAccessRecorder {
    pub fn new(documents: DocumentStore) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl KnowledgeAccessLog for ChunkAccessRecorder {
    async fn record(&self, namespace: &str, entry_id: &str, query: &str) {
        let agent_id = namespace.to_string();
        if let Err(e) = self
            .documents
            .log_chunk_access(&agent_id, entry_id, query)
            .await
        {
            tracing::debug!(error = %e, "chunk access log write failed");
        }
    }
}
