//! Vector backend seam
//!
//! The index core is backend-agnostic: anything that can store embeddings
//! under (namespace, key) and run a similarity search plugs in here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::RagError;
use vaani_core::EntryStatus;

/// Entry as stored by a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEntry {
    pub entry_id: String,
    /// Dedup key, unique within a namespace
    pub key: String,
    pub title: Option<String>,
    pub text: String,
    pub embedding: Vec<f32>,
    pub status: EntryStatus,
    /// Position within the source document, when known
    pub chunk_index: Option<usize>,
}

/// Search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHit {
    pub entry_id: String,
    pub key: String,
    pub title: Option<String>,
    pub text: String,
    pub score: f32,
    pub chunk_index: Option<usize>,
}

/// Key reference for prefix listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRef {
    pub key: String,
    pub entry_id: String,
}

/// One page of a namespace listing
#[derive(Debug, Clone)]
pub struct EntryPage {
    pub entries: Vec<BackendHit>,
    /// Opaque cursor; `None` when the listing is exhausted
    pub cursor: Option<String>,
}

/// Outcome of a bulk namespace delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceClear {
    /// Backend removed the namespace; count of removed entries
    Deleted(u64),
    /// Backend cannot bulk-delete; caller falls back to probe deletion
    Unsupported,
}

/// Storage backend for the RAG index
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn upsert(&self, namespace: &str, entries: Vec<BackendEntry>) -> Result<(), RagError>;

    /// Hits ordered by descending score
    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<BackendHit>, RagError>;

    async fn fetch_by_key(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<BackendHit>, RagError>;

    /// Returns whether an entry was removed
    async fn delete(&self, namespace: &str, entry_id: &str) -> Result<bool, RagError>;

    async fn list(
        &self,
        namespace: &str,
        status: Option<EntryStatus>,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<EntryPage, RagError>;

    /// Keys in a namespace matching a prefix
    async fn list_keys(&self, namespace: &str, prefix: &str) -> Result<Vec<KeyRef>, RagError>;

    async fn delete_namespace(&self, namespace: &str) -> Result<NamespaceClear, RagError>;
}
