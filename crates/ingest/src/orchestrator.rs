//! Ingestion orchestrator
//!
//! Parse → chunk → content-hash keys → diff against the vector namespace →
//! insert new, delete stale, leave matches alone. Re-running on an
//! unchanged file reports zero created and zero deleted.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};

use crate::chunking::{ChunkStrategy, ChunkingService, TextChunk};
use crate::parser::DocumentParser;
use crate::IngestError;
use vaani_config::constants::ingest as ingest_constants;
use vaani_core::{now_ms, AgentId, ChunkRecord, DocumentId};
use vaani_persistence::documents::IngestionSessionRecord;
use vaani_persistence::DocumentStore;
use vaani_rag::{AddRequest, AddStatus, RagIndex};
use vaani_text::{chunk_key, content_hash};

/// Per-document ingestion options
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub agent_id: AgentId,
    pub document_id: DocumentId,
    pub source_type: String,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_created: usize,
    pub chunks_updated: usize,
    pub chunks_deleted: usize,
    pub total_chunks: usize,
    pub duration_ms: u64,
}

/// Parse/chunk/upsert pipeline
pub struct IngestionPipeline {
    parser: DocumentParser,
    chunker: ChunkingService,
    index: Arc<RagIndex>,
    /// Optional bookkeeping sink; ingestion itself only needs the index
    documents: Option<DocumentStore>,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(parser: DocumentParser, chunker: ChunkingService, index: Arc<RagIndex>) -> Self {
        Self {
            parser,
            chunker,
            index,
            documents: None,
            batch_size: ingest_constants::INSERT_BATCH_SIZE,
        }
    }

    pub fn with_document_store(mut self, store: DocumentStore) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Idempotent ingestion of one file into the agent's namespace
    pub async fn ingest_file_idempotent(
        &self,
        path: &Path,
        options: &IngestOptions,
    ) -> Result<IngestReport, IngestError> {
        let started = Instant::now();
        let namespace = options.agent_id.clone();
        let key_prefix = format!("{}_{}_", options.agent_id, options.document_id);

        let parsed = self.parser.parse_file(path).await?;
        let (strategy, chunks) = self.chunker.auto_chunk_text(&parsed.content)?;

        // Identical normalized content within the document collapses to one
        // key; the first occurrence wins.
        let mut keyed: Vec<(String, String, TextChunk)> = Vec::new();
        let mut seen_keys = HashSet::new();
        for chunk in chunks {
            let hash = content_hash(&chunk.text);
            let key = chunk_key(&options.agent_id, &options.document_id, &hash);
            if seen_keys.insert(key.clone()) {
                keyed.push((key, hash, chunk));
            }
        }

        let existing = self.index.list_keys(&namespace, &key_prefix).await?;
        let existing_keys: HashSet<&str> = existing.iter().map(|k| k.key.as_str()).collect();
        let current_keys: HashSet<&str> = keyed.iter().map(|(k, _, _)| k.as_str()).collect();

        let total_chunks = keyed.len();

        // Insert chunks whose keys are new, in bounded batches.
        let to_insert: Vec<&(String, String, TextChunk)> = keyed
            .iter()
            .filter(|(key, _, _)| !existing_keys.contains(key.as_str()))
            .collect();

        let index = self.index.clone();
        let insert_results: Vec<Result<(String, String, usize, String), IngestError>> =
            stream::iter(to_insert.iter().map(|(key, hash, chunk)| {
                let index = index.clone();
                let namespace = namespace.clone();
                let key = key.clone();
                let hash = hash.clone();
                let text = chunk.text.clone();
                let chunk_index = chunk.chunk_index;
                async move {
                    let result = index
                        .add(AddRequest {
                            namespace,
                            key: Some(key.clone()),
                            text,
                            title: None,
                            chunk_index: Some(chunk_index),
                        })
                        .await?;
                    Ok((key, hash, chunk_index, result.entry_id))
                }
            }))
            .buffer_unordered(self.batch_size)
            .collect()
            .await;

        let mut created = Vec::new();
        for result in insert_results {
            created.push(result?);
        }

        // Delete entries whose keys vanished from the document.
        let mut deleted = 0usize;
        for stale in existing
            .iter()
            .filter(|k| !current_keys.contains(k.key.as_str()))
        {
            if self.index.delete(&namespace, &stale.entry_id).await? {
                deleted += 1;
            }
        }

        let report = IngestReport {
            chunks_created: created.len(),
            chunks_updated: 0,
            chunks_deleted: deleted,
            total_chunks,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            agent_id = options.agent_id.as_str(),
            document_id = options.document_id.as_str(),
            strategy = ?strategy,
            created = report.chunks_created,
            deleted = report.chunks_deleted,
            total = report.total_chunks,
            "document ingested"
        );
        metrics::counter!("ingest_chunks_created").increment(report.chunks_created as u64);
        metrics::counter!("ingest_chunks_deleted").increment(report.chunks_deleted as u64);

        if let Some(store) = &self.documents {
            self.record_bookkeeping(store, options, &keyed, &created, &report)
                .await?;
        }

        Ok(report)
    }

    /// Rewrite chunk metadata and append the run summary
    async fn record_bookkeeping(
        &self,
        store: &DocumentStore,
        options: &IngestOptions,
        keyed: &[(String, String, TextChunk)],
        created: &[(String, String, usize, String)],
        report: &IngestReport,
    ) -> Result<(), IngestError> {
        store
            .delete_chunks_by_document(&options.document_id)
            .await?;

        let entry_id_for = |key: &str| -> Option<&str> {
            created
                .iter()
                .find(|(k, _, _, _)| k == key)
                .map(|(_, _, _, id)| id.as_str())
        };

        let total = keyed.len();
        let records: Vec<ChunkRecord> = keyed
            .iter()
            .map(|(key, hash, chunk)| ChunkRecord {
                chunk_id: key.clone(),
                document_id: options.document_id.clone(),
                agent_id: options.agent_id.clone(),
                rag_namespace: options.agent_id.clone(),
                rag_entry_id: entry_id_for(key).unwrap_or_default().to_string(),
                chunk_index: chunk.chunk_index,
                total_chunks: total,
                text: chunk
                    .text
                    .chars()
                    .take(ingest_constants::CHUNK_PREVIEW_CHARS)
                    .collect(),
                content_hash: hash.clone(),
                created_at: now_ms(),
            })
            .collect();
        store.insert_chunks(&records).await?;

        store
            .record_ingestion_session(&IngestionSessionRecord {
                agent_id: options.agent_id.clone(),
                document_id: options.document_id.clone(),
                chunks_created: report.chunks_created,
                chunks_updated: report.chunks_updated,
                chunks_deleted: report.chunks_deleted,
                duration_ms: report.duration_ms,
                recorded_at: now_ms(),
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserConfig;
    use std::io::Write;
    use vaani_rag::{HashEmbedder, MemoryVectorBackend};
    use vaani_text::Tokenizer;

    fn pipeline() -> (IngestionPipeline, Arc<RagIndex>) {
        let tokenizer = Arc::new(Tokenizer::with_cache_capacity(4096).expect("cl100k table"));
        let index = Arc::new(RagIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::new(128)),
        ));
        let parser = DocumentParser::new(ParserConfig {
            service_url: None,
            ..Default::default()
        })
        .unwrap();
        let pipeline = IngestionPipeline::new(
            parser,
            ChunkingService::new(tokenizer),
            index.clone(),
        );
        (pipeline, index)
    }

    fn options() -> IngestOptions {
        IngestOptions {
            agent_id: "agent_1".into(),
            document_id: "doc_1".into(),
            source_type: "upload".into(),
        }
    }

    fn write_faq(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    const FAQ_V1: &str = "Q: What time do you open?\nA: We open at 9 AM.\n\nQ: Where are you located?\nA: 12 Main Street.\n\nQ: Do you take cards?\nA: Yes, all major cards.";
    const FAQ_V2: &str = "Q: What time do you open?\nA: We open at 9 AM.\n\nQ: Where are you located?\nA: 14 Oak Avenue now.\n\nQ: Do you take cards?\nA: Yes, all major cards.";

    #[tokio::test]
    async fn test_first_run_creates_all() {
        let (pipeline, _) = pipeline();
        let file = write_faq(FAQ_V1);

        let report = pipeline
            .ingest_file_idempotent(file.path(), &options())
            .await
            .unwrap();

        assert_eq!(report.chunks_created, 3);
        assert_eq!(report.chunks_deleted, 0);
        assert_eq!(report.total_chunks, 3);
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let (pipeline, _) = pipeline();
        let file = write_faq(FAQ_V1);
        let opts = options();

        pipeline.ingest_file_idempotent(file.path(), &opts).await.unwrap();
        let second = pipeline.ingest_file_idempotent(file.path(), &opts).await.unwrap();

        assert_eq!(second.chunks_created, 0);
        assert_eq!(second.chunks_updated, 0);
        assert_eq!(second.chunks_deleted, 0);
    }

    #[tokio::test]
    async fn test_modified_chunk_swaps_key() {
        let (pipeline, _) = pipeline();
        let opts = options();

        let v1 = write_faq(FAQ_V1);
        pipeline.ingest_file_idempotent(v1.path(), &opts).await.unwrap();

        let v2 = write_faq(FAQ_V2);
        let report = pipeline.ingest_file_idempotent(v2.path(), &opts).await.unwrap();

        assert_eq!(report.chunks_created, 1);
        assert_eq!(report.chunks_deleted, 1);
    }

    #[tokio::test]
    async fn test_ingested_content_searchable() {
        let (pipeline, index) = pipeline();
        let file = write_faq(FAQ_V1);
        pipeline
            .ingest_file_idempotent(file.path(), &options())
            .await
            .unwrap();

        let response = index
            .search(vaani_rag::SearchRequest {
                namespace: "agent_1".into(),
                query: "where located".into(),
                limit: 3,
                score_threshold: 0.0,
                chunk_context: None,
            })
            .await
            .unwrap();
        assert!(!response.is_empty());
        assert!(response.text.contains("Main Street"));
    }

    #[tokio::test]
    async fn test_bookkeeping_records_written() {
        let tokenizer = Arc::new(Tokenizer::with_cache_capacity(4096).unwrap());
        let index = Arc::new(RagIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::new(128)),
        ));
        let db = std::sync::Arc::new(vaani_persistence::MemoryDb::new());
        let store = DocumentStore::new(db.clone());
        let parser = DocumentParser::new(ParserConfig {
            service_url: None,
            ..Default::default()
        })
        .unwrap();
        let pipeline = IngestionPipeline::new(parser, ChunkingService::new(tokenizer), index)
            .with_document_store(store.clone());

        let file = write_faq(FAQ_V1);
        pipeline
            .ingest_file_idempotent(file.path(), &options())
            .await
            .unwrap();

        let records = store.list_chunks_by_document(&"doc_1".to_string()).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.rag_namespace == "agent_1"));
        assert!(records
            .iter()
            .all(|r| r.chunk_id == format!("agent_1_doc_1_{}", r.content_hash)));
    }
}
