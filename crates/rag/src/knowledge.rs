//! Voice knowledge service
//!
//! Thin facade over the RAG index tuned for voice latency: queries are
//! expanded before embedding, thresholds adjust per intent, successful
//! results are memoized, and item + knowledge searches fan out in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::index::{ChunkContext, RagIndex, SearchRequest, SearchResponse};
use crate::query_expansion::{expand_query, threshold_for, InfoType};
use crate::result_cache::ResultCache;
use crate::RagError;
use vaani_config::constants::{cache as cache_constants, rag as rag_constants};
use vaani_text::Tokenizer;

/// Business info categories exposed to tools
pub type BusinessInfoType = InfoType;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Cache,
    Index,
}

/// Voice-facing search response
#[derive(Debug, Clone)]
pub struct VoiceSearchResponse {
    pub response: SearchResponse,
    pub expanded: bool,
    pub info_type: Option<InfoType>,
    /// Effective similarity threshold after intent adjustment
    pub threshold_used: f32,
    pub source: SearchSource,
    pub latency_ms: u64,
}

impl VoiceSearchResponse {
    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.response.text
    }
}

/// Facade tuning
#[derive(Debug, Clone)]
pub struct VoiceSearchConfig {
    pub similarity_threshold: f32,
    pub default_limit: usize,
}

impl Default for VoiceSearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: rag_constants::DEFAULT_SCORE_THRESHOLD,
            default_limit: rag_constants::DEFAULT_LIMIT,
        }
    }
}

/// Hybrid search options
#[derive(Debug, Clone)]
pub struct HybridOptions {
    pub include_items: bool,
    pub include_knowledge: bool,
    pub items_limit: usize,
    pub knowledge_limit: usize,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self {
            include_items: true,
            include_knowledge: true,
            items_limit: 3,
            knowledge_limit: 5,
        }
    }
}

/// Hybrid search output
#[derive(Debug, Clone, Default)]
pub struct HybridResponse {
    pub items: Option<VoiceSearchResponse>,
    pub knowledge: Option<VoiceSearchResponse>,
}

/// Best-effort retrieval hit sink (chunk access bookkeeping)
#[async_trait]
pub trait KnowledgeAccessLog: Send + Sync {
    async fn record(&self, namespace: &str, entry_id: &str, query: &str);
}

/// Per-organization business profile source (structured answers that skip
/// retrieval entirely when configured)
#[async_trait]
pub trait OrgInfoProvider: Send + Sync {
    async fn fetch(&self, organization_id: &str) -> Option<Value>;
}

/// Voice-optimized knowledge facade for one agent
pub struct VoiceKnowledgeService {
    index: Arc<RagIndex>,
    tokenizer: Arc<Tokenizer>,
    /// Knowledge namespace; equals the agent id
    namespace: String,
    organization_id: String,
    config: VoiceSearchConfig,
    cache: ResultCache,
    org_info: Mutex<HashMap<String, (Value, Instant)>>,
    org_info_ttl: Duration,
    org_provider: Option<Arc<dyn OrgInfoProvider>>,
    access_log: Option<Arc<dyn KnowledgeAccessLog>>,
}

impl VoiceKnowledgeService {
    pub fn new(
        index: Arc<RagIndex>,
        tokenizer: Arc<Tokenizer>,
        namespace: impl Into<String>,
        organization_id: impl Into<String>,
        config: VoiceSearchConfig,
    ) -> Self {
        Self {
            index,
            tokenizer,
            namespace: namespace.into(),
            organization_id: organization_id.into(),
            config,
            cache: ResultCache::with_defaults(),
            org_info: Mutex::new(HashMap::new()),
            org_info_ttl: Duration::from_secs(cache_constants::ORG_INFO_TTL_SECS),
            org_provider: None,
            access_log: None,
        }
    }

    pub fn with_org_provider(mut self, provider: Arc<dyn OrgInfoProvider>) -> Self {
        self.org_provider = Some(provider);
        self
    }

    pub fn with_access_log(mut self, sink: Arc<dyn KnowledgeAccessLog>) -> Self {
        self.access_log = Some(sink);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Search the agent's knowledge namespace
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<VoiceSearchResponse, RagError> {
        self.search_namespace(&self.namespace, query, limit.unwrap_or(self.config.default_limit), None)
            .await
    }

    /// Search and return the joined context text alongside the response
    pub async fn search_with_context(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<(VoiceSearchResponse, String), RagError> {
        let response = self
            .search_namespace(
                &self.namespace,
                query,
                limit,
                Some(ChunkContext { before: 1, after: 1 }),
            )
            .await?;
        let context = response.response.text.clone();
        Ok((response, context))
    }

    /// Run item and knowledge sub-queries in parallel
    pub async fn hybrid_search(
        &self,
        query: &str,
        options: HybridOptions,
    ) -> Result<HybridResponse, RagError> {
        let items_namespace = format!("{}_items", self.namespace);

        let items_future = async {
            if options.include_items {
                Some(
                    self.search_namespace(&items_namespace, query, options.items_limit, None)
                        .await,
                )
            } else {
                None
            }
        };
        let knowledge_future = async {
            if options.include_knowledge {
                Some(
                    self.search_namespace(&self.namespace, query, options.knowledge_limit, None)
                        .await,
                )
            } else {
                None
            }
        };

        let (items, knowledge) = tokio::join!(items_future, knowledge_future);

        Ok(HybridResponse {
            items: items.transpose()?,
            knowledge: knowledge.transpose()?,
        })
    }

    /// Structured business info with knowledge-search fallback
    pub async fn get_business_info(
        &self,
        info_type: BusinessInfoType,
    ) -> Result<Option<String>, RagError> {
        if let Some(value) = self.org_info_lookup(info_type).await {
            return Ok(Some(value));
        }

        let query = match info_type {
            InfoType::Hours => "what are your business hours",
            InfoType::Location => "where are you located",
            InfoType::Contact => "how can I contact you",
            InfoType::Policies => "what are your policies",
            InfoType::Features => "what services do you offer",
            InfoType::General => "general information about the business",
        };

        let response = self.search(query, Some(3)).await?;
        if response.is_empty() {
            Ok(None)
        } else {
            Ok(Some(response.response.text.clone()))
        }
    }

    /// Fire-and-forget warmup on agent activation
    pub fn warmup_namespace(&self) {
        let index = self.index.clone();
        let namespace = self.namespace.clone();
        tokio::spawn(async move {
            match index.warmup(&namespace).await {
                Ok(report) if report.latency_ms > rag_constants::COLD_SEARCH_MS => {
                    tracing::warn!(
                        namespace,
                        latency_ms = report.latency_ms,
                        cold = true,
                        "warmup hit a cold path"
                    );
                }
                Ok(report) => {
                    tracing::debug!(namespace, latency_ms = report.latency_ms, "warmup done");
                }
                Err(e) => {
                    tracing::warn!(namespace, error = %e, "warmup failed");
                }
            }
        });
    }

    /// Reset caches (test hook)
    pub fn reset_caches(&self) {
        self.cache.reset();
        self.org_info.lock().clear();
    }

    async fn search_namespace(
        &self,
        namespace: &str,
        query: &str,
        limit: usize,
        chunk_context: Option<ChunkContext>,
    ) -> Result<VoiceSearchResponse, RagError> {
        let expansion = expand_query(query, &self.tokenizer)?;
        let threshold = threshold_for(expansion.info_type, self.config.similarity_threshold);

        if let Some(cached) = self.cache.get(namespace, &expansion.original, limit) {
            return Ok(VoiceSearchResponse {
                response: cached,
                expanded: expansion.was_expanded,
                info_type: expansion.info_type,
                threshold_used: threshold,
                source: SearchSource::Cache,
                latency_ms: 0,
            });
        }

        let started = Instant::now();
        let response = self
            .index
            .search(SearchRequest {
                namespace: namespace.to_string(),
                query: expansion.expanded.clone(),
                limit,
                score_threshold: threshold,
                chunk_context,
            })
            .await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if latency_ms > rag_constants::COLD_SEARCH_MS {
            tracing::warn!(
                namespace,
                latency_ms,
                cold = true,
                query = expansion.original.as_str(),
                "cold knowledge search"
            );
        }

        if !response.is_empty() {
            self.cache
                .put(namespace, &expansion.original, limit, response.clone());

            if let Some(sink) = &self.access_log {
                for entry in &response.results {
                    sink.record(namespace, &entry.entry_id, &expansion.original).await;
                }
            }
        }

        Ok(VoiceSearchResponse {
            response,
            expanded: expansion.was_expanded,
            info_type: expansion.info_type,
            threshold_used: threshold,
            source: SearchSource::Index,
            latency_ms,
        })
    }

    async fn org_info_lookup(&self, info_type: BusinessInfoType) -> Option<String> {
        let provider = self.org_provider.as_ref()?;

        let cached = {
            let cache = self.org_info.lock();
            cache.get(&self.organization_id).and_then(|(value, at)| {
                (at.elapsed() <= self.org_info_ttl).then(|| value.clone())
            })
        };

        let profile = match cached {
            Some(value) => value,
            None => {
                let value = provider.fetch(&self.organization_id).await?;
                self.org_info
                    .lock()
                    .insert(self.organization_id.clone(), (value.clone(), Instant::now()));
                value
            }
        };

        let key = match info_type {
            InfoType::Hours => "hours",
            InfoType::Location => "location",
            InfoType::Contact => "contact",
            InfoType::Policies => "policies",
            InfoType::Features => "features",
            InfoType::General => "general",
        };

        profile
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::index::AddRequest;
    use crate::memory_backend::MemoryVectorBackend;
    use serde_json::json;

    async fn service_with_data() -> VoiceKnowledgeService {
        let index = Arc::new(RagIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::new(128)),
        ));
        let tokenizer = Arc::new(Tokenizer::with_cache_capacity(1024).expect("cl100k table"));

        for (ns, key, text) in [
            ("agent_1", "k1", "our business hours are nine to five monday through friday"),
            ("agent_1", "k2", "we are located at 12 main street downtown"),
            ("agent_1_items", "i1", "espresso machine model x200 price four hundred"),
        ] {
            index
                .add(AddRequest {
                    namespace: ns.into(),
                    key: Some(key.into()),
                    text: text.into(),
                    title: None,
                    chunk_index: None,
                })
                .await
                .unwrap();
        }

        VoiceKnowledgeService::new(
            index,
            tokenizer,
            "agent_1",
            "org_1",
            VoiceSearchConfig {
                similarity_threshold: 0.05,
                default_limit: 5,
            },
        )
    }

    struct StaticOrgInfo;

    #[async_trait]
    impl OrgInfoProvider for StaticOrgInfo {
        async fn fetch(&self, _organization_id: &str) -> Option<Value> {
            Some(json!({ "hours": "Open 9 AM to 5 PM, Monday to Friday" }))
        }
    }

    #[tokio::test]
    async fn test_short_query_expansion_and_threshold() {
        let service = service_with_data().await;
        let response = service.search("hours", None).await.unwrap();

        assert!(response.expanded);
        assert_eq!(response.info_type, Some(InfoType::Hours));
        assert!((response.threshold_used - 0.0).abs() < 1e-6);
        assert!(!response.is_empty());
        assert!(response.text().contains("business hours"));
    }

    #[tokio::test]
    async fn test_second_search_hits_cache() {
        let service = service_with_data().await;
        let first = service.search("business hours", None).await.unwrap();
        assert_eq!(first.source, SearchSource::Index);

        let second = service.search("business hours", None).await.unwrap();
        assert_eq!(second.source, SearchSource::Cache);
        assert_eq!(second.response.results.len(), first.response.results.len());
    }

    #[tokio::test]
    async fn test_hybrid_search_returns_both() {
        let service = service_with_data().await;
        let hybrid = service
            .hybrid_search(
                "espresso machine hours",
                HybridOptions::default(),
            )
            .await
            .unwrap();

        let items = hybrid.items.unwrap();
        let knowledge = hybrid.knowledge.unwrap();
        assert!(!items.is_empty());
        assert!(!knowledge.is_empty());
    }

    #[tokio::test]
    async fn test_hybrid_respects_flags() {
        let service = service_with_data().await;
        let hybrid = service
            .hybrid_search(
                "espresso",
                HybridOptions {
                    include_items: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(hybrid.items.is_none());
        assert!(hybrid.knowledge.is_some());
    }

    #[tokio::test]
    async fn test_business_info_prefers_org_profile() {
        let service = service_with_data().await.with_org_provider(Arc::new(StaticOrgInfo));
        let info = service.get_business_info(InfoType::Hours).await.unwrap();
        assert_eq!(info.unwrap(), "Open 9 AM to 5 PM, Monday to Friday");
    }

    #[tokio::test]
    async fn test_business_info_falls_back_to_search() {
        let service = service_with_data().await;
        let info = service.get_business_info(InfoType::Location).await.unwrap();
        assert!(info.unwrap().contains("main street"));
    }

    #[tokio::test]
    async fn test_empty_namespace_returns_none() {
        let index = Arc::new(RagIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::new(64)),
        ));
        let tokenizer = Arc::new(Tokenizer::with_cache_capacity(64).unwrap());
        let service = VoiceKnowledgeService::new(
            index,
            tokenizer,
            "empty_agent",
            "org_1",
            VoiceSearchConfig::default(),
        );

        let info = service.get_business_info(InfoType::Policies).await.unwrap();
        assert!(info.is_none());
    }
}
