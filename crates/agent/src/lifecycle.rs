//! Agent lifecycle
//!
//! Create, update, clone, and delete. Updates that touch the system
//! prompt rebuild the denormalized full prompt and bump the prompt
//! version to the write timestamp. Delete cascades over the dependent
//! tables in a fixed order with step-numbered logging so a failed run can
//! resume from the table that broke.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::{build_full_prompt, AgentDomain};
use crate::AgentError;
use vaani_core::{now_ms, Agent, AgentId, AgentPatch, AgentStatus};
use vaani_persistence::PersistenceLayer;
use vaani_rag::RagIndex;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone regex"));

/// New-agent parameters
#[derive(Debug, Clone)]
pub struct CreateAgentRequest {
    pub organization_id: String,
    pub name: String,
    pub role: Option<String>,
    pub ai_persona_name: Option<String>,
    pub system_prompt: String,
    pub language: String,
    pub greeting: String,
    pub farewell: String,
    pub config: Value,
    pub phone_country_code: Option<String>,
    pub phone_number: Option<String>,
    pub phone_location: Option<String>,
    pub business_type: Option<String>,
}

/// Updatable fields. `system_prompt` changes trigger the prompt rebuild.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub role: Option<String>,
    pub ai_persona_name: Option<String>,
    pub system_prompt: Option<String>,
    pub language: Option<String>,
    pub greeting: Option<String>,
    pub farewell: Option<String>,
    pub config: Option<Value>,
    pub phone_number: Option<String>,
    pub status: Option<AgentStatus>,
}

/// Cascade delete outcome
#[derive(Debug, Clone)]
pub struct CascadeReport {
    /// (table, rows deleted) in execution order
    pub tables: Vec<(&'static str, u64)>,
    /// Sum over the dependent tables; the agent record is not counted
    pub total_records_deleted: u64,
    pub namespace_cleanup_scheduled: bool,
}

/// Lifecycle service
pub struct AgentLifecycle {
    stores: PersistenceLayer,
    index: Arc<RagIndex>,
}

impl AgentLifecycle {
    pub fn new(stores: PersistenceLayer, index: Arc<RagIndex>) -> Self {
        Self { stores, index }
    }

    pub async fn create(&self, request: CreateAgentRequest) -> Result<Agent, AgentError> {
        validate_create(&request)?;

        let now = now_ms();
        let domain = AgentDomain::from_config(&request.config).unwrap_or_else(|| {
            AgentDomain::detect(
                &request.name,
                request.role.as_deref(),
                &request.system_prompt,
                request.business_type.as_deref(),
            )
        });
        let full_prompt = build_full_prompt(
            &request.system_prompt,
            domain,
            request.ai_persona_name.as_deref(),
            &request.language,
        );

        let mut config = request.config;
        if config.get("domain").is_none() {
            if let Some(object) = config.as_object_mut() {
                object.insert("domain".into(), Value::String(domain.as_str().into()));
            }
        }

        let agent = Agent {
            id: format!("agent_{}", uuid::Uuid::new_v4()),
            organization_id: request.organization_id,
            name: request.name,
            role: request.role,
            ai_persona_name: request.ai_persona_name,
            system_prompt: request.system_prompt,
            full_prompt,
            prompt_version: now,
            config,
            language: request.language,
            greeting: request.greeting,
            farewell: request.farewell,
            phone_country_code: request.phone_country_code,
            phone_number: request.phone_number,
            phone_location: request.phone_location,
            status: AgentStatus::Active,
            enable_contextual_enrichment: false,
            created_at: now,
            updated_at: now,
        };

        self.stores.agents.insert(&agent).await?;
        tracing::info!(agent_id = agent.id.as_str(), domain = domain.as_str(), "agent created");
        Ok(agent)
    }

    /// Apply an update; rebuilds `full_prompt` and bumps `prompt_version`
    /// when the system prompt changes.
    pub async fn update(&self, agent_id: &AgentId, update: AgentUpdate) -> Result<Agent, AgentError> {
        let current = self
            .stores
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| AgentError::NotFound(agent_id.clone()))?;

        if let Some(phone) = &update.phone_number {
            validate_phone(phone)?;
        }

        let now = now_ms();
        let mut patch = AgentPatch {
            name: update.name.clone(),
            role: update.role.clone(),
            ai_persona_name: update.ai_persona_name.clone(),
            system_prompt: update.system_prompt.clone(),
            language: update.language.clone(),
            greeting: update.greeting,
            farewell: update.farewell,
            config: update.config.clone(),
            phone_number: update.phone_number,
            status: update.status,
            updated_at: Some(now),
            ..Default::default()
        };

        let prompt_inputs_changed = update.system_prompt.is_some()
            || update.ai_persona_name.is_some()
            || update.language.is_some();
        if prompt_inputs_changed {
            let system_prompt = update
                .system_prompt
                .as_deref()
                .unwrap_or(&current.system_prompt);
            let persona = update
                .ai_persona_name
                .as_deref()
                .or(current.ai_persona_name.as_deref());
            let language = update.language.as_deref().unwrap_or(&current.language);
            let config = update.config.as_ref().unwrap_or(&current.config);

            let domain = AgentDomain::from_config(config).unwrap_or_else(|| {
                AgentDomain::detect(
                    update.name.as_deref().unwrap_or(&current.name),
                    update.role.as_deref().or(current.role.as_deref()),
                    system_prompt,
                    None,
                )
            });

            patch.full_prompt = Some(build_full_prompt(system_prompt, domain, persona, language));
            patch.prompt_version = Some(now);
        }

        let updated = self
            .stores
            .agents
            .patch(agent_id, &patch)
            .await?
            .ok_or_else(|| AgentError::NotFound(agent_id.clone()))?;
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
    ) -> Result<(), AgentError> {
        let patch = AgentPatch {
            status: Some(status),
            updated_at: Some(now_ms()),
            ..Default::default()
        };
        self.stores
            .agents
            .patch(agent_id, &patch)
            .await?
            .ok_or_else(|| AgentError::NotFound(agent_id.clone()))?;
        Ok(())
    }

    /// Copy an agent's persona and prompts under a fresh id. The clone
    /// starts with an empty knowledge namespace and no phone number.
    pub async fn clone_agent(
        &self,
        agent_id: &AgentId,
        new_name: &str,
    ) -> Result<Agent, AgentError> {
        let source = self
            .stores
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| AgentError::NotFound(agent_id.clone()))?;

        let now = now_ms();
        let clone = Agent {
            id: format!("agent_{}", uuid::Uuid::new_v4()),
            name: new_name.to_string(),
            phone_country_code: None,
            phone_number: None,
            phone_location: None,
            prompt_version: now,
            created_at: now,
            updated_at: now,
            ..source
        };

        self.stores.agents.insert(&clone).await?;
        tracing::info!(
            source = agent_id.as_str(),
            clone = clone.id.as_str(),
            "agent cloned"
        );
        Ok(clone)
    }

    /// Delete an agent and everything it owns, in fixed table order.
    pub async fn delete_agent(&self, agent_id: &AgentId) -> Result<CascadeReport, AgentError> {
        if self.stores.agents.get(agent_id).await?.is_none() {
            return Err(AgentError::NotFound(agent_id.clone()));
        }

        let mut tables: Vec<(&'static str, u64)> = Vec::with_capacity(13);
        let mut step = 0usize;

        macro_rules! cascade {
            ($table:literal, $future:expr) => {{
                step += 1;
                let deleted = $future.await.map_err(|e| AgentError::Cascade {
                    step,
                    table: $table,
                    message: e.to_string(),
                })?;
                tracing::debug!(step, table = $table, deleted, "cascade step done");
                tables.push(($table, deleted));
            }};
        }

        cascade!("callSessions", self.stores.sessions.delete_by_agent(agent_id));
        cascade!("callInteractions", self.stores.interactions.delete_by_agent(agent_id));
        cascade!("callMetrics", self.stores.sessions.delete_metrics_by_agent(agent_id));
        cascade!("documents", self.stores.documents.delete_documents_by_agent(agent_id));
        cascade!("chunks", self.stores.documents.delete_chunks_by_agent(agent_id));
        cascade!("chunkAccessLog", self.stores.documents.delete_access_log_by_agent(agent_id));
        cascade!(
            "ingestionSessions",
            self.stores.documents.delete_ingestion_sessions_by_agent(agent_id)
        );
        cascade!("deletedFiles", self.stores.documents.delete_deleted_files_by_agent(agent_id));
        cascade!("deletionQueue", self.stores.documents.delete_deletion_queue_by_agent(agent_id));
        cascade!("agentIntegrations", self.stores.integrations.delete_by_agent(agent_id));
        cascade!("integrationLogs", self.stores.integrations.delete_logs_by_agent(agent_id));

        // Step 12: schedule the vector namespace cleanup. Best-effort; the
        // index is not part of the transactional store.
        step += 1;
        let index = self.index.clone();
        let namespace = agent_id.clone();
        tokio::spawn(async move {
            match index.clear_namespace(&namespace).await {
                Ok(removed) => {
                    tracing::info!(namespace = namespace.as_str(), removed, "namespace cleared")
                }
                Err(e) => {
                    tracing::warn!(namespace = namespace.as_str(), error = %e, "namespace cleanup failed")
                }
            }
        });
        tracing::debug!(step, table = "ragNamespace", "cascade cleanup scheduled");

        cascade!(
            "agentKnowledgeMetadata",
            self.stores.documents.delete_knowledge_metadata_by_agent(agent_id)
        );

        // Final step: the agent record itself, not counted in the total.
        step += 1;
        self.stores.agents.delete(agent_id).await.map_err(|e| {
            AgentError::Cascade {
                step,
                table: "agents",
                message: e.to_string(),
            }
        })?;

        let total_records_deleted = tables.iter().map(|(_, n)| n).sum();
        metrics::counter!("agents_deleted").increment(1);
        tracing::info!(
            agent_id = agent_id.as_str(),
            total_records_deleted,
            "agent cascade delete complete"
        );

        Ok(CascadeReport {
            tables,
            total_records_deleted,
            namespace_cleanup_scheduled: true,
        })
    }

    /// Rebuild `full_prompt` for every agent whose denormalized prompt is
    /// missing. Idempotent: a second run finds nothing to do.
    pub async fn rebuild_all_prompts(&self) -> Result<usize, AgentError> {
        let agents = self.stores.agents.list_all().await?;
        let mut rebuilt = 0usize;

        for agent in agents {
            if !agent.full_prompt.trim().is_empty() {
                continue;
            }
            let domain = AgentDomain::from_config(&agent.config).unwrap_or_else(|| {
                AgentDomain::detect(&agent.name, agent.role.as_deref(), &agent.system_prompt, None)
            });
            let now = now_ms();
            let patch = AgentPatch {
                full_prompt: Some(build_full_prompt(
                    &agent.system_prompt,
                    domain,
                    agent.ai_persona_name.as_deref(),
                    &agent.language,
                )),
                prompt_version: Some(now),
                updated_at: Some(now),
                ..Default::default()
            };
            self.stores.agents.patch(&agent.id, &patch).await?;
            rebuilt += 1;
        }

        tracing::info!(rebuilt, "prompt rebuild migration finished");
        Ok(rebuilt)
    }
}

fn validate_create(request: &CreateAgentRequest) -> Result<(), AgentError> {
    if request.name.trim().is_empty() {
        return Err(AgentError::Validation("agent name is required".into()));
    }
    if request.system_prompt.trim().is_empty() {
        return Err(AgentError::Validation("system prompt is required".into()));
    }
    if request.language.trim().is_empty() {
        return Err(AgentError::Validation("language is required".into()));
    }
    if let Some(phone) = &request.phone_number {
        validate_phone(phone)?;
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), AgentError> {
    if !PHONE_RE.is_match(phone) {
        return Err(AgentError::Validation(format!(
            "invalid phone number: {}",
            phone
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaani_rag::{HashEmbedder, MemoryVectorBackend};

    fn lifecycle() -> AgentLifecycle {
        AgentLifecycle::new(
            PersistenceLayer::in_memory(),
            Arc::new(RagIndex::new(
                Arc::new(MemoryVectorBackend::new()),
                Arc::new(HashEmbedder::new(64)),
            )),
        )
    }

    fn create_request(name: &str) -> CreateAgentRequest {
        CreateAgentRequest {
            organization_id: "org_1".into(),
            name: name.into(),
            role: None,
            ai_persona_name: Some("Asha".into()),
            system_prompt: "You take table reservations for our restaurant.".into(),
            language: "en-US".into(),
            greeting: "Hello!".into(),
            farewell: "Goodbye!".into(),
            config: serde_json::json!({}),
            phone_country_code: None,
            phone_number: Some("+15550100".into()),
            phone_location: None,
            business_type: None,
        }
    }

    #[tokio::test]
    async fn test_create_builds_prompt_and_domain() {
        let lifecycle = lifecycle();
        let agent = lifecycle.create(create_request("Bella Host")).await.unwrap();

        assert!(agent.full_prompt.contains("You are Asha"));
        assert!(agent.full_prompt.contains("table reservations"));
        assert_eq!(agent.config["domain"], "restaurant");
        assert_eq!(agent.prompt_version, agent.updated_at);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let lifecycle = lifecycle();
        let mut request = create_request("x");
        request.name = "  ".into();
        assert!(matches!(
            lifecycle.create(request).await,
            Err(AgentError::Validation(_))
        ));

        let mut request = create_request("x");
        request.phone_number = Some("not-a-phone".into());
        assert!(matches!(
            lifecycle.create(request).await,
            Err(AgentError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_system_prompt_rebuilds() {
        let lifecycle = lifecycle();
        let agent = lifecycle.create(create_request("Host")).await.unwrap();
        let before_version = agent.prompt_version;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = lifecycle
            .update(
                &agent.id,
                AgentUpdate {
                    system_prompt: Some("You now handle takeout orders only.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.full_prompt.contains("takeout orders only"));
        assert_eq!(updated.prompt_version, updated.updated_at);
        assert!(updated.prompt_version > before_version);
    }

    #[tokio::test]
    async fn test_update_without_prompt_keeps_version() {
        let lifecycle = lifecycle();
        let agent = lifecycle.create(create_request("Host")).await.unwrap();

        let updated = lifecycle
            .update(
                &agent.id,
                AgentUpdate {
                    greeting: Some("Welcome!".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.prompt_version, agent.prompt_version);
        assert_eq!(updated.full_prompt, agent.full_prompt);
    }

    #[tokio::test]
    async fn test_clone_resets_identity() {
        let lifecycle = lifecycle();
        let agent = lifecycle.create(create_request("Host")).await.unwrap();

        let clone = lifecycle.clone_agent(&agent.id, "Host Copy").await.unwrap();
        assert_ne!(clone.id, agent.id);
        assert_eq!(clone.name, "Host Copy");
        assert!(clone.phone_number.is_none());
        assert_eq!(clone.system_prompt, agent.system_prompt);
    }

    #[tokio::test]
    async fn test_delete_missing_agent() {
        let lifecycle = lifecycle();
        assert!(matches!(
            lifecycle.delete_agent(&"ghost".to_string()).await,
            Err(AgentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rebuild_all_prompts_idempotent() {
        let lifecycle = lifecycle();
        let agent = lifecycle.create(create_request("Host")).await.unwrap();

        // Blank out the denormalized prompt to simulate legacy rows.
        let patch = AgentPatch {
            full_prompt: Some(String::new()),
            ..Default::default()
        };
        lifecycle.stores.agents.patch(&agent.id, &patch).await.unwrap();

        assert_eq!(lifecycle.rebuild_all_prompts().await.unwrap(), 1);
        assert_eq!(lifecycle.rebuild_all_prompts().await.unwrap(), 0);
    }
}
