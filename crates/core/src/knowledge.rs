//! Knowledge artifacts: documents and their persisted chunk metadata
//!
//! The vector-store entry key is exactly `{agent_id}_{document_id}_{content_hash}`
//! and `rag_namespace` always equals the owning agent id.

use serde::{Deserialize, Serialize};

use crate::{AgentId, DocumentId, EntryId, EpochMs};

/// Uploaded knowledge artifact belonging to one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: DocumentId,
    pub agent_id: AgentId,
    pub source_type: String,
    pub filename: String,
    pub file_size: u64,
    pub created_at: EpochMs,
}

/// Vector-store entry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    #[default]
    Ready,
    Replaced,
}

/// Persisted chunk metadata (the vector itself lives in the RAG index)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub document_id: DocumentId,
    pub agent_id: AgentId,
    /// Always equals `agent_id`
    pub rag_namespace: String,
    /// Opaque vector-store id
    pub rag_entry_id: EntryId,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// First chars of the chunk, kept for debugging
    pub text: String,
    pub content_hash: String,
    pub created_at: EpochMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_status_serde() {
        assert_eq!(
            serde_json::to_string(&EntryStatus::Replaced).unwrap(),
            "\"replaced\""
        );
    }
}
