//! Per-agent integration wiring and execution logs

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::DocumentDb;
use crate::error::PersistenceError;
use crate::paths;
use vaani_core::{now_ms, AgentId, Integration, IntegrationStatus, TriggerType};

/// Typed access to agent integrations
#[derive(Clone)]
pub struct IntegrationStore {
    db: Arc<dyn DocumentDb>,
}

impl IntegrationStore {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self { db }
    }

    pub async fn install(&self, integration: &Integration) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::agent_integrations::INSERT,
                json!({ "integration": integration }),
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, integration_id: &str) -> Result<Option<Integration>, PersistenceError> {
        let value = self
            .db
            .query(
                paths::agent_integrations::GET,
                json!({ "integrationId": integration_id }),
            )
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn list_by_agent(&self, agent_id: &AgentId) -> Result<Vec<Integration>, PersistenceError> {
        let value = self
            .db
            .query(paths::agent_integrations::LIST_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Integrations wired to fire for a trigger
    pub async fn list_for_trigger(
        &self,
        agent_id: &AgentId,
        trigger: TriggerType,
    ) -> Result<Vec<Integration>, PersistenceError> {
        Ok(self
            .list_by_agent(agent_id)
            .await?
            .into_iter()
            .filter(|i| i.is_enabled_for(trigger))
            .collect())
    }

    pub async fn set_status(
        &self,
        integration_id: &str,
        status: IntegrationStatus,
    ) -> Result<bool, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::agent_integrations::PATCH_STATUS,
                json!({ "integrationId": integration_id, "status": status }),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Append an execution log row
    pub async fn log_execution(
        &self,
        agent_id: &AgentId,
        integration_id: &str,
        trigger: TriggerType,
        success: bool,
        execution_time_ms: u64,
        error: Option<&str>,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::integration_logs::INSERT,
                json!({ "entry": {
                    "agent_id": agent_id,
                    "integration_id": integration_id,
                    "trigger": trigger,
                    "success": success,
                    "execution_time_ms": execution_time_ms,
                    "error": error,
                    "recorded_at": now_ms(),
                } }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(paths::agent_integrations::DELETE_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn delete_logs_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(paths::integration_logs::DELETE_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    fn integration(id: &str, agent: &str, triggers: Vec<TriggerType>) -> Integration {
        Integration {
            integration_id: id.into(),
            agent_id: agent.into(),
            tool_id: "slack".into(),
            name: "Notify channel".into(),
            config: json!({ "webhookUrl": "https://hooks.slack.com/services/T/B/x" }),
            enabled_triggers: triggers,
            status: IntegrationStatus::Active,
            created_at: now_ms(),
        }
    }

    #[tokio::test]
    async fn test_install_and_trigger_filter() {
        let store = IntegrationStore::new(Arc::new(MemoryDb::new()));
        store
            .install(&integration("i1", "a1", vec![TriggerType::CallEnded]))
            .await
            .unwrap();
        store
            .install(&integration("i2", "a1", vec![TriggerType::CallStarted]))
            .await
            .unwrap();

        let fired = store
            .list_for_trigger(&"a1".to_string(), TriggerType::CallEnded)
            .await
            .unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].integration_id, "i1");
    }

    #[tokio::test]
    async fn test_disabled_excluded_from_trigger() {
        let store = IntegrationStore::new(Arc::new(MemoryDb::new()));
        store
            .install(&integration("i1", "a1", vec![TriggerType::CallEnded]))
            .await
            .unwrap();
        store
            .set_status("i1", IntegrationStatus::Disabled)
            .await
            .unwrap();

        let fired = store
            .list_for_trigger(&"a1".to_string(), TriggerType::CallEnded)
            .await
            .unwrap();
        assert!(fired.is_empty());
    }
}
