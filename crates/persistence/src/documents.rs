//! Documents, chunk metadata, and ingestion bookkeeping

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::DocumentDb;
use crate::error::PersistenceError;
use crate::paths;
use vaani_core::{now_ms, AgentId, ChunkRecord, Document, DocumentId};

/// Summary row written after every ingestion run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestionSessionRecord {
    pub agent_id: AgentId,
    pub document_id: DocumentId,
    pub chunks_created: usize,
    pub chunks_updated: usize,
    pub chunks_deleted: usize,
    pub duration_ms: u64,
    pub recorded_at: i64,
}

/// Typed access to knowledge bookkeeping tables
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<dyn DocumentDb>,
}

impl DocumentStore {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self { db }
    }

    pub async fn insert_document(&self, document: &Document) -> Result<(), PersistenceError> {
        self.db
            .mutation(paths::documents::INSERT, json!({ "document": document }))
            .await?;
        Ok(())
    }

    pub async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<Document>, PersistenceError> {
        let value = self
            .db
            .query(paths::documents::GET, json!({ "documentId": document_id }))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn list_documents_by_agent(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<Document>, PersistenceError> {
        let value = self
            .db
            .query(paths::documents::LIST_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn insert_chunks(&self, records: &[ChunkRecord]) -> Result<usize, PersistenceError> {
        if records.is_empty() {
            return Ok(0);
        }
        let value = self
            .db
            .mutation(paths::chunks::INSERT_MANY, json!({ "records": records }))
            .await?;
        Ok(value.get("inserted").and_then(Value::as_u64).unwrap_or(0) as usize)
    }

    pub async fn list_chunks_by_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<ChunkRecord>, PersistenceError> {
        let value = self
            .db
            .query(paths::chunks::LIST_BY_DOCUMENT, json!({ "documentId": document_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_chunks_by_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(paths::chunks::DELETE_BY_DOCUMENT, json!({ "documentId": document_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Best-effort retrieval hit log. Failures are swallowed by callers.
    pub async fn log_chunk_access(
        &self,
        agent_id: &AgentId,
        entry_id: &str,
        query: &str,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::chunk_access_log::INSERT,
                json!({ "entry": {
                    "agent_id": agent_id,
                    "entry_id": entry_id,
                    "query": query,
                    "accessed_at": now_ms(),
                } }),
            )
            .await?;
        Ok(())
    }

    pub async fn record_ingestion_session(
        &self,
        record: &IngestionSessionRecord,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(paths::ingestion_sessions::INSERT, json!({ "session": record }))
            .await?;
        Ok(())
    }

    /// Tombstone a removed upload
    pub async fn mark_file_deleted(
        &self,
        agent_id: &AgentId,
        document_id: &DocumentId,
        filename: &str,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::deleted_files::INSERT,
                json!({ "file": {
                    "agent_id": agent_id,
                    "document_id": document_id,
                    "filename": filename,
                    "deleted_at": now_ms(),
                } }),
            )
            .await?;
        Ok(())
    }

    /// Queue a vector-store cleanup job
    pub async fn enqueue_deletion(
        &self,
        agent_id: &AgentId,
        namespace: &str,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::deletion_queue::INSERT,
                json!({ "item": {
                    "agent_id": agent_id,
                    "namespace": namespace,
                    "queued_at": now_ms(),
                } }),
            )
            .await?;
        Ok(())
    }

    pub async fn upsert_knowledge_metadata(
        &self,
        agent_id: &AgentId,
        document_count: usize,
        chunk_count: usize,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::agent_knowledge_metadata::UPSERT,
                json!({ "metadata": {
                    "agent_id": agent_id,
                    "document_count": document_count,
                    "chunk_count": chunk_count,
                    "updated_at": now_ms(),
                } }),
            )
            .await?;
        Ok(())
    }

    /// Per-table deletes used by the agent cascade
    pub async fn delete_documents_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::documents::DELETE_BY_AGENT, agent_id).await
    }

    pub async fn delete_chunks_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::chunks::DELETE_BY_AGENT, agent_id).await
    }

    pub async fn delete_access_log_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::chunk_access_log::DELETE_BY_AGENT, agent_id).await
    }

    pub async fn delete_ingestion_sessions_by_agent(
        &self,
        agent_id: &AgentId,
    ) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::ingestion_sessions::DELETE_BY_AGENT, agent_id).await
    }

    pub async fn delete_deleted_files_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::deleted_files::DELETE_BY_AGENT, agent_id).await
    }

    pub async fn delete_deletion_queue_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::deletion_queue::DELETE_BY_AGENT, agent_id).await
    }

    pub async fn delete_knowledge_metadata_by_agent(
        &self,
        agent_id: &AgentId,
    ) -> Result<u64, PersistenceError> {
        self.delete_by_agent(paths::agent_knowledge_metadata::DELETE_BY_AGENT, agent_id)
            .await
    }

    async fn delete_by_agent(&self, path: &str, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(path, json!({ "agentId": agent_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}
