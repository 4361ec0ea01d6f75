//! In-memory vector backend
//!
//! Cosine search over per-namespace entry maps. Used by tests and
//! single-node development runs.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::backend::{BackendEntry, BackendHit, EntryPage, KeyRef, NamespaceClear, VectorBackend};
use crate::RagError;
use vaani_core::EntryStatus;

/// Process-local vector store
#[derive(Default)]
pub struct MemoryVectorBackend {
    namespaces: DashMap<String, Vec<BackendEntry>>,
}

impl MemoryVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry count for a namespace (test hook)
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map(|e| e.len()).unwrap_or(0)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn to_hit(entry: &BackendEntry, score: f32) -> BackendHit {
    BackendHit {
        entry_id: entry.entry_id.clone(),
        key: entry.key.clone(),
        title: entry.title.clone(),
        text: entry.text.clone(),
        score,
        chunk_index: entry.chunk_index,
    }
}

#[async_trait]
impl VectorBackend for MemoryVectorBackend {
    async fn upsert(&self, namespace: &str, entries: Vec<BackendEntry>) -> Result<(), RagError> {
        let mut ns = self.namespaces.entry(namespace.to_string()).or_default();
        for entry in entries {
            if let Some(existing) = ns.iter_mut().find(|e| e.key == entry.key) {
                *existing = entry;
            } else {
                ns.push(entry);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<BackendHit>, RagError> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<BackendHit> = ns
            .iter()
            .filter(|e| e.status != EntryStatus::Replaced)
            .map(|e| to_hit(e, cosine(vector, &e.embedding)))
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn fetch_by_key(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<BackendHit>, RagError> {
        Ok(self
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.iter().find(|e| e.key == key).map(|e| to_hit(e, 0.0))))
    }

    async fn delete(&self, namespace: &str, entry_id: &str) -> Result<bool, RagError> {
        let Some(mut ns) = self.namespaces.get_mut(namespace) else {
            return Ok(false);
        };
        let before = ns.len();
        ns.retain(|e| e.entry_id != entry_id);
        Ok(ns.len() < before)
    }

    async fn list(
        &self,
        namespace: &str,
        status: Option<EntryStatus>,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<EntryPage, RagError> {
        let offset: usize = cursor
            .as_deref()
            .map(|c| c.parse().unwrap_or(0))
            .unwrap_or(0);

        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(EntryPage {
                entries: Vec::new(),
                cursor: None,
            });
        };

        let filtered: Vec<&BackendEntry> = ns
            .iter()
            .filter(|e| status.map(|s| e.status == s).unwrap_or(true))
            .collect();

        let entries: Vec<BackendHit> = filtered
            .iter()
            .skip(offset)
            .take(limit)
            .map(|e| to_hit(e, 0.0))
            .collect();

        let next = offset + entries.len();
        let cursor = if next < filtered.len() {
            Some(next.to_string())
        } else {
            None
        };

        Ok(EntryPage { entries, cursor })
    }

    async fn list_keys(&self, namespace: &str, prefix: &str) -> Result<Vec<KeyRef>, RagError> {
        Ok(self
            .namespaces
            .get(namespace)
            .map(|ns| {
                ns.iter()
                    .filter(|e| e.key.starts_with(prefix))
                    .map(|e| KeyRef {
                        key: e.key.clone(),
                        entry_id: e.entry_id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<NamespaceClear, RagError> {
        let removed = self
            .namespaces
            .remove(namespace)
            .map(|(_, entries)| entries.len() as u64)
            .unwrap_or(0);
        Ok(NamespaceClear::Deleted(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, key: &str, embedding: Vec<f32>) -> BackendEntry {
        BackendEntry {
            entry_id: id.into(),
            key: key.into(),
            title: None,
            text: format!("text for {}", id),
            embedding,
            status: EntryStatus::Ready,
            chunk_index: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_same_key_replaces() {
        let backend = MemoryVectorBackend::new();
        backend
            .upsert("ns", vec![entry("e1", "k1", vec![1.0, 0.0])])
            .await
            .unwrap();
        backend
            .upsert("ns", vec![entry("e2", "k1", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(backend.namespace_len("ns"), 1);
    }

    #[tokio::test]
    async fn test_search_ordering() {
        let backend = MemoryVectorBackend::new();
        backend
            .upsert(
                "ns",
                vec![
                    entry("close", "k1", vec![1.0, 0.0]),
                    entry("far", "k2", vec![0.0, 1.0]),
                    entry("mid", "k3", vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let hits = backend.search("ns", &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits[0].entry_id, "close");
        assert_eq!(hits[1].entry_id, "mid");
        assert_eq!(hits[2].entry_id, "far");
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let backend = MemoryVectorBackend::new();
        backend
            .upsert("agent_a", vec![entry("e1", "k1", vec![1.0])])
            .await
            .unwrap();

        let hits = backend.search("agent_b", &[1.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_pagination() {
        let backend = MemoryVectorBackend::new();
        let entries: Vec<BackendEntry> = (0..5)
            .map(|i| entry(&format!("e{}", i), &format!("k{}", i), vec![1.0]))
            .collect();
        backend.upsert("ns", entries).await.unwrap();

        let page1 = backend.list("ns", None, None, 2).await.unwrap();
        assert_eq!(page1.entries.len(), 2);
        let page2 = backend.list("ns", None, page1.cursor, 2).await.unwrap();
        assert_eq!(page2.entries.len(), 2);
        let page3 = backend.list("ns", None, page2.cursor, 2).await.unwrap();
        assert_eq!(page3.entries.len(), 1);
        assert!(page3.cursor.is_none());
    }

    #[tokio::test]
    async fn test_delete_namespace_counts() {
        let backend = MemoryVectorBackend::new();
        backend
            .upsert(
                "ns",
                vec![entry("e1", "k1", vec![1.0]), entry("e2", "k2", vec![1.0])],
            )
            .await
            .unwrap();

        assert_eq!(
            backend.delete_namespace("ns").await.unwrap(),
            NamespaceClear::Deleted(2)
        );
        assert_eq!(backend.namespace_len("ns"), 0);
    }
}
