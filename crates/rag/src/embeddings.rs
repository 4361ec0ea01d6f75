//! Embedding backends
//!
//! `HttpEmbedder` talks to the embedding API; `HashEmbedder` is a
//! deterministic stand-in used by tests and development so retrieval paths
//! run without a model server.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::RagError;
use vaani_config::constants::timeouts;

/// Pluggable embedding seam
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dim(&self) -> usize;
}

/// Embedding API configuration
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub embedding_dim: usize,
    pub api_key: Option<String>,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: vaani_config::constants::endpoints::EMBEDDING_DEFAULT.to_string(),
            model: "qwen3-embedding:0.6b".to_string(),
            embedding_dim: 1024,
            api_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP embedding client
pub struct HttpEmbedder {
    client: Client,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeouts::EMBEDDING_REQUEST_MS))
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let request = EmbedRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
        };

        let url = format!("{}/api/embed", self.config.endpoint.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "embedding API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("bad embedding response: {}", e)))?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("no embedding returned".to_string()))
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim
    }
}

/// Deterministic hash embedder
///
/// Buckets lowercase words into the vector by hash, then L2-normalizes.
/// Texts sharing words get meaningfully cosine-similar vectors, which is
/// enough for hermetic retrieval tests.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vector = vec![0.0f32; self.dim];

        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dim as u64) as usize;
            let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
