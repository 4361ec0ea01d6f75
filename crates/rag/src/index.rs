//! Namespace-scoped RAG index
//!
//! Agent-facing surface over a [`VectorBackend`]: key-idempotent adds,
//! threshold-filtered search with optional neighbor-chunk context, paginated
//! listing, best-effort namespace clearing, and warmup probes that prime the
//! embedding API and the index before the first real query.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendEntry, EntryPage, KeyRef, NamespaceClear, VectorBackend};
use crate::embeddings::Embedder;
use crate::RagError;
use vaani_config::constants::rag as rag_constants;
use vaani_core::EntryStatus;

/// Queries used to sweep a namespace when the backend cannot bulk-delete
const PROBE_QUERIES: &[&str] = &[
    "hours schedule timing availability",
    "price cost fees charges",
    "location address directions map",
    "contact phone email reach",
    "services products offerings catalog",
    "policy rules terms conditions",
    "help support assistance questions",
    "general information overview about",
];

/// Queries fired by warmup; deliberately dissimilar so the vector index
/// touches different regions
const WARMUP_QUERIES: &[&str] = &[
    "opening hours and availability today",
    "price list and service costs",
    "where are you located and how to get there",
];

/// Add request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequest {
    pub namespace: String,
    /// Dedup key; adds with an existing key are no-ops
    pub key: Option<String>,
    pub text: String,
    pub title: Option<String>,
    pub chunk_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStatus {
    Inserted,
    /// Key already present; the existing entry was left untouched
    Exists,
}

#[derive(Debug, Clone)]
pub struct AddResult {
    pub entry_id: String,
    pub status: AddStatus,
}

/// Neighboring chunks pulled into search results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChunkContext {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub namespace: String,
    pub query: String,
    pub limit: usize,
    pub score_threshold: f32,
    pub chunk_context: Option<ChunkContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRef {
    pub entry_id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryOut {
    pub entry_id: String,
    pub title: Option<String>,
    pub text: String,
}

/// Search response: scored refs, the joined context text, and the entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ScoredRef>,
    pub text: String,
    pub entries: Vec<EntryOut>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ListRequest {
    pub namespace: String,
    pub status: Option<EntryStatus>,
    pub cursor: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct WarmupReport {
    pub latency_ms: u64,
    pub total_results: usize,
}

/// Namespace-scoped vector index
pub struct RagIndex {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
}

impl RagIndex {
    pub fn new(backend: Arc<dyn VectorBackend>, embedder: Arc<dyn Embedder>) -> Self {
        Self { backend, embedder }
    }

    /// Add one entry. Re-adding an existing key returns the existing entry
    /// id without touching the store or the embedding API.
    pub async fn add(&self, request: AddRequest) -> Result<AddResult, RagError> {
        if let Some(key) = &request.key {
            if let Some(existing) = self.backend.fetch_by_key(&request.namespace, key).await? {
                return Ok(AddResult {
                    entry_id: existing.entry_id,
                    status: AddStatus::Exists,
                });
            }
        }

        let embedding = self.embedder.embed(&request.text).await?;
        let entry_id = uuid::Uuid::new_v4().to_string();
        let entry = BackendEntry {
            entry_id: entry_id.clone(),
            key: request
                .key
                .unwrap_or_else(|| format!("auto_{}", entry_id)),
            title: request.title,
            text: request.text,
            embedding,
            status: EntryStatus::Ready,
            chunk_index: request.chunk_index,
        };

        self.backend.upsert(&request.namespace, vec![entry]).await?;
        Ok(AddResult {
            entry_id,
            status: AddStatus::Inserted,
        })
    }

    /// Threshold-filtered similarity search. Empty and whitespace queries
    /// short-circuit without calling the embedder.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, RagError> {
        if request.query.trim().is_empty() {
            return Ok(SearchResponse::default());
        }

        let vector = self.embedder.embed(&request.query).await?;
        let hits = self
            .backend
            .search(&request.namespace, &vector, request.limit)
            .await?;

        let mut entries: Vec<EntryOut> = Vec::new();
        let mut results: Vec<ScoredRef> = Vec::new();
        for hit in hits {
            if hit.score < request.score_threshold {
                continue;
            }
            results.push(ScoredRef {
                entry_id: hit.entry_id.clone(),
                score: hit.score,
            });
            entries.push(EntryOut {
                entry_id: hit.entry_id,
                title: hit.title,
                text: hit.text,
            });
        }

        if let Some(context) = request.chunk_context {
            if context.before > 0 || context.after > 0 {
                self.expand_context(&request.namespace, context, &results, &mut entries)
                    .await?;
            }
        }

        let text = entries
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(SearchResponse {
            results,
            text,
            entries,
        })
    }

    /// Pull chunks adjacent to each hit from the same source document
    async fn expand_context(
        &self,
        namespace: &str,
        context: ChunkContext,
        results: &[ScoredRef],
        entries: &mut Vec<EntryOut>,
    ) -> Result<(), RagError> {
        let mut seen: std::collections::HashSet<String> =
            entries.iter().map(|e| e.entry_id.clone()).collect();
        let mut neighbors = Vec::new();

        for scored in results {
            // The backend search hit carries key and chunk index; re-resolve
            // them from the namespace listing.
            let page = self.backend.list(namespace, None, None, 1024).await?;
            let Some(hit) = page.entries.into_iter().find(|e| e.entry_id == scored.entry_id)
            else {
                continue;
            };
            let (Some(index), Some(prefix)) = (hit.chunk_index, doc_prefix(&hit.key)) else {
                continue;
            };

            let low = index.saturating_sub(context.before);
            let high = index + context.after;
            for key_ref in self.backend.list_keys(namespace, &prefix).await? {
                let Some(candidate) = self.backend.fetch_by_key(namespace, &key_ref.key).await?
                else {
                    continue;
                };
                let Some(candidate_index) = candidate.chunk_index else {
                    continue;
                };
                if candidate_index >= low
                    && candidate_index <= high
                    && seen.insert(candidate.entry_id.clone())
                {
                    neighbors.push(candidate);
                }
            }
        }

        neighbors.sort_by_key(|h| h.chunk_index);
        entries.extend(neighbors.into_iter().map(|h| EntryOut {
            entry_id: h.entry_id,
            title: h.title,
            text: h.text,
        }));

        Ok(())
    }

    pub async fn delete(&self, namespace: &str, entry_id: &str) -> Result<bool, RagError> {
        self.backend.delete(namespace, entry_id).await
    }

    pub async fn list(&self, request: ListRequest) -> Result<EntryPage, RagError> {
        self.backend
            .list(
                &request.namespace,
                request.status,
                request.cursor,
                request.limit,
            )
            .await
    }

    /// Keys in a namespace matching a prefix (ingestion diffing)
    pub async fn list_keys(&self, namespace: &str, prefix: &str) -> Result<Vec<KeyRef>, RagError> {
        self.backend.list_keys(namespace, prefix).await
    }

    /// Best-effort bulk delete of a namespace. Backends that cannot
    /// enumerate fall back to sweeping with diverse probe queries until a
    /// round comes back empty or the attempt budget runs out.
    pub async fn clear_namespace(&self, namespace: &str) -> Result<u64, RagError> {
        match self.backend.delete_namespace(namespace).await? {
            NamespaceClear::Deleted(count) => {
                tracing::info!(namespace, count, "namespace cleared");
                Ok(count)
            }
            NamespaceClear::Unsupported => self.clear_by_probes(namespace).await,
        }
    }

    async fn clear_by_probes(&self, namespace: &str) -> Result<u64, RagError> {
        let mut deleted = 0u64;

        for round in 0..rag_constants::CLEAR_PROBE_ROUNDS {
            let mut round_deleted = 0u64;
            for probe in PROBE_QUERIES.iter().take(4) {
                let response = self
                    .search(SearchRequest {
                        namespace: namespace.to_string(),
                        query: probe.to_string(),
                        limit: 32,
                        score_threshold: 0.0,
                        chunk_context: None,
                    })
                    .await?;
                for entry in response.results {
                    if self.backend.delete(namespace, &entry.entry_id).await? {
                        round_deleted += 1;
                    }
                }
            }
            deleted += round_deleted;
            if round_deleted == 0 {
                tracing::debug!(namespace, round, "probe clear converged");
                break;
            }
        }

        Ok(deleted)
    }

    /// Prime the embedding API and the vector index with three parallel,
    /// semantically diverse probes. Idempotent; returns observed latency.
    pub async fn warmup(&self, namespace: &str) -> Result<WarmupReport, RagError> {
        let started = Instant::now();

        let probe = |query: &'static str| {
            self.search(SearchRequest {
                namespace: namespace.to_string(),
                query: query.to_string(),
                limit: 1,
                score_threshold: 0.05,
                chunk_context: None,
            })
        };

        let (a, b, c) = futures::join!(
            probe(WARMUP_QUERIES[0]),
            probe(WARMUP_QUERIES[1]),
            probe(WARMUP_QUERIES[2]),
        );

        let total_results = [a?, b?, c?].iter().map(|r| r.results.len()).sum();
        let latency_ms = started.elapsed().as_millis() as u64;

        metrics::histogram!("rag_warmup_latency_ms").record(latency_ms as f64);
        tracing::debug!(namespace, latency_ms, total_results, "namespace warmup complete");

        Ok(WarmupReport {
            latency_ms,
            total_results,
        })
    }
}

/// Document prefix of a chunk key: everything up to the content hash
fn doc_prefix(key: &str) -> Option<String> {
    key.rfind('_').map(|pos| key[..=pos].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::memory_backend::MemoryVectorBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        fn dim(&self) -> usize {
            self.inner.dim()
        }
    }

    fn index() -> RagIndex {
        RagIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::new(128)),
        )
    }

    fn add_request(ns: &str, key: &str, text: &str) -> AddRequest {
        AddRequest {
            namespace: ns.into(),
            key: Some(key.into()),
            text: text.into(),
            title: None,
            chunk_index: None,
        }
    }

    #[tokio::test]
    async fn test_add_same_key_noop() {
        let index = index();
        let first = index
            .add(add_request("ns", "k1", "opening hours are nine to five"))
            .await
            .unwrap();
        assert_eq!(first.status, AddStatus::Inserted);

        let second = index
            .add(add_request("ns", "k1", "different text, same key"))
            .await
            .unwrap();
        assert_eq!(second.status, AddStatus::Exists);
        assert_eq!(second.entry_id, first.entry_id);
    }

    #[tokio::test]
    async fn test_search_orders_and_thresholds() {
        let index = index();
        index
            .add(add_request("ns", "k1", "our opening hours are nine to five daily"))
            .await
            .unwrap();
        index
            .add(add_request("ns", "k2", "the quarterly tax filing deadline approaches"))
            .await
            .unwrap();

        let response = index
            .search(SearchRequest {
                namespace: "ns".into(),
                query: "opening hours".into(),
                limit: 5,
                score_threshold: 0.01,
                chunk_context: None,
            })
            .await
            .unwrap();

        assert!(!response.is_empty());
        // Scores descending.
        assert!(response
            .results
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
        // Context text carries the best entry.
        assert!(response.text.contains("opening hours"));
    }

    #[tokio::test]
    async fn test_empty_query_never_embeds() {
        let embedder = Arc::new(CountingEmbedder {
            inner: HashEmbedder::new(64),
            calls: AtomicUsize::new(0),
        });
        let index = RagIndex::new(Arc::new(MemoryVectorBackend::new()), embedder.clone());

        let response = index
            .search(SearchRequest {
                namespace: "ns".into(),
                query: "   ".into(),
                limit: 5,
                score_threshold: 0.0,
                chunk_context: None,
            })
            .await
            .unwrap();

        assert!(response.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_visible_to_search() {
        let index = index();
        index
            .add(add_request("ns", "k1", "we are located on main street downtown"))
            .await
            .unwrap();

        let response = index
            .search(SearchRequest {
                namespace: "ns".into(),
                query: "located main street".into(),
                limit: 3,
                score_threshold: 0.0,
                chunk_context: None,
            })
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_namespace() {
        let index = index();
        for i in 0..4 {
            index
                .add(add_request("ns", &format!("k{}", i), &format!("entry number {}", i)))
                .await
                .unwrap();
        }

        let cleared = index.clear_namespace("ns").await.unwrap();
        assert_eq!(cleared, 4);

        let response = index
            .search(SearchRequest {
                namespace: "ns".into(),
                query: "entry".into(),
                limit: 10,
                score_threshold: 0.0,
                chunk_context: None,
            })
            .await
            .unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_warmup_idempotent() {
        let index = index();
        index
            .add(add_request("ns", "k1", "opening hours nine to five"))
            .await
            .unwrap();

        let first = index.warmup("ns").await.unwrap();
        let second = index.warmup("ns").await.unwrap();
        // Warmup never mutates; both runs see the same index.
        assert_eq!(first.total_results, second.total_results);
    }

    #[tokio::test]
    async fn test_delete_frees_key() {
        let index = index();
        let added = index
            .add(add_request("ns", "k1", "some text here"))
            .await
            .unwrap();

        assert!(index.delete("ns", &added.entry_id).await.unwrap());

        let re_added = index
            .add(add_request("ns", "k1", "some text here"))
            .await
            .unwrap();
        assert_eq!(re_added.status, AddStatus::Inserted);
    }
}
