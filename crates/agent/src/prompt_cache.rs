//! Three-layer prompt cache
//!
//! 1. Agent-config LRU keyed by agent id, 60 s TTL
//! 2. Full-prompt LRU keyed by `{agent_id}:{updated_at}` — version-keyed,
//!    so any agent write invalidates it without coordination
//! 3. The denormalized `full_prompt` column itself
//!
//! A missing `full_prompt` falls back to the raw system prompt and
//! surfaces `source = missing` as the hint to run the rebuild migration.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::AgentError;
use vaani_config::constants::cache;
use vaani_core::{Agent, AgentId};
use vaani_persistence::AgentStore;

/// Which layer answered the lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    Ram,
    Db,
    /// `full_prompt` absent; raw system prompt returned instead
    Missing,
    NotFound,
}

/// Prompt lookup outcome
#[derive(Debug, Clone)]
pub struct PromptLookup {
    pub prompt: Option<String>,
    pub source: PromptSource,
    pub latency_ms: u64,
}

/// Agent config + full prompt caches over the agent store
pub struct PromptService {
    agents: AgentStore,
    config_cache: Mutex<LruCache<AgentId, (Agent, Instant)>>,
    config_ttl: Duration,
    prompt_cache: Mutex<LruCache<String, (String, Instant)>>,
    prompt_ttl: Duration,
}

impl PromptService {
    pub fn new(agents: AgentStore) -> Self {
        Self {
            agents,
            config_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache::AGENT_CONFIG_CAPACITY).expect("capacity"),
            )),
            config_ttl: Duration::from_secs(cache::AGENT_CONFIG_TTL_SECS),
            prompt_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache::PROMPT_CACHE_CAPACITY).expect("capacity"),
            )),
            prompt_ttl: Duration::from_secs(cache::PROMPT_CACHE_TTL_SECS),
        }
    }

    /// Agent record, via the 60 s config cache
    pub async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, AgentError> {
        {
            let mut cached = self.config_cache.lock();
            if let Some((agent, at)) = cached.get(agent_id) {
                if at.elapsed() <= self.config_ttl {
                    return Ok(Some(agent.clone()));
                }
                cached.pop(agent_id);
            }
        }

        let agent = self.agents.get(agent_id).await?;
        if let Some(agent) = &agent {
            self.config_cache
                .lock()
                .put(agent_id.clone(), (agent.clone(), Instant::now()));
        }
        Ok(agent)
    }

    /// The full prompt for a call, with its source layer and latency
    pub async fn get_cached_full_prompt(
        &self,
        agent_id: &AgentId,
    ) -> Result<PromptLookup, AgentError> {
        let started = Instant::now();

        let Some(agent) = self.get_agent(agent_id).await? else {
            metrics::counter!("prompt_cache_source", "source" => "not_found").increment(1);
            return Ok(PromptLookup {
                prompt: None,
                source: PromptSource::NotFound,
                latency_ms: started.elapsed().as_millis() as u64,
            });
        };

        let version_key = format!("{}:{}", agent.id, agent.updated_at);

        {
            let mut cached = self.prompt_cache.lock();
            if let Some((prompt, at)) = cached.get(&version_key) {
                if at.elapsed() <= self.prompt_ttl {
                    metrics::counter!("prompt_cache_source", "source" => "ram").increment(1);
                    return Ok(PromptLookup {
                        prompt: Some(prompt.clone()),
                        source: PromptSource::Ram,
                        latency_ms: started.elapsed().as_millis() as u64,
                    });
                }
                cached.pop(&version_key);
            }
        }

        if !agent.full_prompt.trim().is_empty() {
            self.prompt_cache
                .lock()
                .put(version_key, (agent.full_prompt.clone(), Instant::now()));
            metrics::counter!("prompt_cache_source", "source" => "db").increment(1);
            return Ok(PromptLookup {
                prompt: Some(agent.full_prompt),
                source: PromptSource::Db,
                latency_ms: started.elapsed().as_millis() as u64,
            });
        }

        // Denormalized prompt never built: serve the raw system prompt and
        // flag it so operators run the rebuild migration.
        tracing::warn!(
            agent_id = agent_id.as_str(),
            "full_prompt missing, serving raw system prompt"
        );
        metrics::counter!("prompt_cache_source", "source" => "missing").increment(1);
        Ok(PromptLookup {
            prompt: Some(agent.system_prompt),
            source: PromptSource::Missing,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Drop the cached config for one agent. The prompt cache is
    /// version-keyed, so stale entries die with the old `updated_at`.
    pub fn invalidate(&self, agent_id: &AgentId) {
        self.config_cache.lock().pop(agent_id);
    }

    /// Drop everything (test hook)
    pub fn reset(&self) {
        self.config_cache.lock().clear();
        self.prompt_cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vaani_core::{now_ms, AgentPatch, AgentStatus};
    use vaani_persistence::MemoryDb;

    fn agent(id: &str, full_prompt: &str) -> Agent {
        let now = now_ms();
        Agent {
            id: id.into(),
            organization_id: "org_1".into(),
            name: "Reception".into(),
            role: None,
            ai_persona_name: None,
            system_prompt: "Answer calls.".into(),
            full_prompt: full_prompt.into(),
            prompt_version: now,
            config: serde_json::json!({}),
            language: "en-US".into(),
            greeting: "Hello".into(),
            farewell: "Bye".into(),
            phone_country_code: None,
            phone_number: None,
            phone_location: None,
            status: AgentStatus::Active,
            enable_contextual_enrichment: false,
            created_at: now,
            updated_at: now,
        }
    }

    async fn service_with(agent_record: Agent) -> (PromptService, AgentStore) {
        let store = AgentStore::new(Arc::new(MemoryDb::new()));
        store.insert(&agent_record).await.unwrap();
        (PromptService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_db_then_ram() {
        let (service, _) = service_with(agent("a1", "Full prompt text")).await;

        let first = service.get_cached_full_prompt(&"a1".to_string()).await.unwrap();
        assert_eq!(first.source, PromptSource::Db);
        assert_eq!(first.prompt.as_deref(), Some("Full prompt text"));

        let second = service.get_cached_full_prompt(&"a1".to_string()).await.unwrap();
        assert_eq!(second.source, PromptSource::Ram);
    }

    #[tokio::test]
    async fn test_missing_full_prompt_falls_back() {
        let (service, _) = service_with(agent("a1", "")).await;

        let lookup = service.get_cached_full_prompt(&"a1".to_string()).await.unwrap();
        assert_eq!(lookup.source, PromptSource::Missing);
        assert_eq!(lookup.prompt.as_deref(), Some("Answer calls."));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (service, _) = service_with(agent("a1", "x")).await;
        let lookup = service.get_cached_full_prompt(&"ghost".to_string()).await.unwrap();
        assert_eq!(lookup.source, PromptSource::NotFound);
        assert!(lookup.prompt.is_none());
    }

    #[tokio::test]
    async fn test_version_key_invalidates_on_write() {
        let (service, store) = service_with(agent("a1", "Old prompt")).await;
        let id = "a1".to_string();

        service.get_cached_full_prompt(&id).await.unwrap();

        // Write bumps updated_at; the old prompt-cache entry is unreachable.
        let patch = AgentPatch {
            full_prompt: Some("New prompt".into()),
            updated_at: Some(now_ms() + 10),
            ..Default::default()
        };
        store.patch(&id, &patch).await.unwrap();
        service.invalidate(&id);

        let lookup = service.get_cached_full_prompt(&id).await.unwrap();
        assert_eq!(lookup.source, PromptSource::Db);
        assert_eq!(lookup.prompt.as_deref(), Some("New prompt"));
    }
}
