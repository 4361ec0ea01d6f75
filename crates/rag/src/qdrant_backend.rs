//! Qdrant vector backend
//!
//! One shared collection; the `namespace` payload field partitions it per
//! agent. Keys live in the payload so idempotent adds can look them up.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition, CountPointsBuilder,
    CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId, PointStruct,
    PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;

use crate::backend::{BackendEntry, BackendHit, EntryPage, KeyRef, NamespaceClear, VectorBackend};
use crate::RagError;
use vaani_core::EntryStatus;

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantBackendConfig {
    pub endpoint: String,
    pub collection: String,
    pub vector_dim: usize,
    pub api_key: Option<String>,
}

impl Default for QdrantBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: vaani_config::constants::endpoints::QDRANT_DEFAULT.to_string(),
            collection: "agent_knowledge".to_string(),
            vector_dim: 1024,
            api_key: None,
        }
    }
}

/// Qdrant-backed vector store
pub struct QdrantBackend {
    client: Qdrant,
    config: QdrantBackendConfig,
}

impl QdrantBackend {
    pub async fn connect(config: QdrantBackendConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        let backend = Self { client, config };
        backend.ensure_collection().await?;
        Ok(backend)
    }

    async fn ensure_collection(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                        VectorParamsBuilder::new(self.config.vector_dim as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;
        }

        Ok(())
    }

    fn namespace_filter(&self, namespace: &str) -> Filter {
        Filter::must([Condition::matches("namespace", namespace.to_string())])
    }
}

fn status_str(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Pending => "pending",
        EntryStatus::Ready => "ready",
        EntryStatus::Replaced => "replaced",
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    id.and_then(|pid| pid.point_id_options)
        .map(|options| match options {
            PointIdOptions::Uuid(u) => u,
            PointIdOptions::Num(n) => n.to_string(),
        })
        .unwrap_or_default()
}

fn payload_hit(
    entry_id: String,
    payload: HashMap<String, qdrant_client::qdrant::Value>,
    score: f32,
) -> BackendHit {
    let get_str = |name: &str| -> Option<String> {
        payload.get(name).and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
    };
    let chunk_index = payload.get("chunk_index").and_then(|v| match v.kind {
        Some(Kind::IntegerValue(n)) if n >= 0 => Some(n as usize),
        _ => None,
    });

    BackendHit {
        entry_id,
        key: get_str("key").unwrap_or_default(),
        title: get_str("title"),
        text: get_str("text").unwrap_or_default(),
        score,
        chunk_index,
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn upsert(&self, namespace: &str, entries: Vec<BackendEntry>) -> Result<(), RagError> {
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = entries
            .into_iter()
            .map(|entry| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("namespace".to_string(), namespace.to_string().into());
                payload.insert("key".to_string(), entry.key.into());
                payload.insert("text".to_string(), entry.text.into());
                payload.insert("status".to_string(), status_str(entry.status).into());
                if let Some(title) = entry.title {
                    payload.insert("title".to_string(), title.into());
                }
                if let Some(index) = entry.chunk_index {
                    payload.insert("chunk_index".to_string(), (index as i64).into());
                }

                PointStruct::new(entry.entry_id, entry.embedding, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points))
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<BackendHit>, RagError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.config.collection, vector.to_vec(), limit as u64)
                    .filter(self.namespace_filter(namespace))
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| {
                let id = point_id_string(point.id);
                payload_hit(id, point.payload, point.score)
            })
            .collect())
    }

    async fn fetch_by_key(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<BackendHit>, RagError> {
        let filter = Filter::must([
            Condition::matches("namespace", namespace.to_string()),
            Condition::matches("key", key.to_string()),
        ]);

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.config.collection)
                    .filter(filter)
                    .limit(1)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(response.result.into_iter().next().map(|point| {
            let id = point_id_string(point.id);
            payload_hit(id, point.payload, 0.0)
        }))
    }

    async fn delete(&self, namespace: &str, entry_id: &str) -> Result<bool, RagError> {
        let _ = namespace;
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.config.collection).points(PointsIdsList {
                    ids: vec![PointId::from(entry_id.to_string())],
                }),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(true)
    }

    async fn list(
        &self,
        namespace: &str,
        status: Option<EntryStatus>,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<EntryPage, RagError> {
        let mut conditions = vec![Condition::matches("namespace", namespace.to_string())];
        if let Some(status) = status {
            conditions.push(Condition::matches("status", status_str(status).to_string()));
        }

        let mut builder = ScrollPointsBuilder::new(&self.config.collection)
            .filter(Filter::must(conditions))
            .limit(limit as u32)
            .with_payload(true);
        if let Some(cursor) = cursor {
            builder = builder.offset(PointId::from(cursor));
        }

        let response = self
            .client
            .scroll(builder)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        let entries = response
            .result
            .into_iter()
            .map(|point| {
                let id = point_id_string(point.id);
                payload_hit(id, point.payload, 0.0)
            })
            .collect();

        Ok(EntryPage {
            entries,
            cursor: response.next_page_offset.map(|id| point_id_string(Some(id))),
        })
    }

    async fn list_keys(&self, namespace: &str, prefix: &str) -> Result<Vec<KeyRef>, RagError> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;

        // Exact prefix match is filtered client-side; payload keyword
        // indexes only support whole-value matches.
        loop {
            let page = self.list(namespace, None, cursor, 256).await?;
            for entry in &page.entries {
                if entry.key.starts_with(prefix) {
                    keys.push(KeyRef {
                        key: entry.key.clone(),
                        entry_id: entry.entry_id.clone(),
                    });
                }
            }
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<NamespaceClear, RagError> {
        let count = self
            .client
            .count(
                CountPointsBuilder::new(&self.config.collection)
                    .filter(self.namespace_filter(namespace))
                    .exact(true),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?
            .result
            .map(|r| r.count)
            .unwrap_or(0);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.config.collection)
                    .points(self.namespace_filter(namespace)),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(NamespaceClear::Deleted(count))
    }
}
