//! Agent table access

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::DocumentDb;
use crate::error::PersistenceError;
use crate::paths;
use vaani_core::{Agent, AgentId, AgentPatch, OrganizationId};

/// Typed access to the agents table
#[derive(Clone)]
pub struct AgentStore {
    db: Arc<dyn DocumentDb>,
}

impl AgentStore {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, agent: &Agent) -> Result<(), PersistenceError> {
        self.db
            .mutation(paths::agents::INSERT, json!({ "agent": agent }))
            .await?;
        Ok(())
    }

    pub async fn get(&self, agent_id: &str) -> Result<Option<Agent>, PersistenceError> {
        let value = self
            .db
            .query(paths::agents::GET, json!({ "id": agent_id }))
            .await?;
        decode_optional(value)
    }

    /// Lookup backed by the `by_phone_and_status` index
    pub async fn get_by_phone(
        &self,
        phone_number: &str,
        status: Option<&str>,
    ) -> Result<Option<Agent>, PersistenceError> {
        let mut args = json!({ "phoneNumber": phone_number });
        if let Some(status) = status {
            args["status"] = json!(status);
        }
        let value = self.db.query(paths::agents::GET_BY_PHONE, args).await?;
        decode_optional(value)
    }

    pub async fn list_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Agent>, PersistenceError> {
        let value = self
            .db
            .query(
                paths::agents::LIST_BY_ORGANIZATION,
                json!({ "organizationId": organization_id }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn list_all(&self) -> Result<Vec<Agent>, PersistenceError> {
        let value = self.db.query(paths::agents::LIST_ALL, json!({})).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Atomic single-record patch
    pub async fn patch(
        &self,
        agent_id: &AgentId,
        patch: &AgentPatch,
    ) -> Result<Option<Agent>, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::agents::PATCH,
                json!({ "id": agent_id, "patch": patch }),
            )
            .await?;
        decode_optional(value)
    }

    /// Delete the agent record itself. Dependent tables are the lifecycle
    /// service's responsibility.
    pub async fn delete(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(paths::agents::DELETE, json!({ "id": agent_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}

fn decode_optional(value: Value) -> Result<Option<Agent>, PersistenceError> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use vaani_core::{now_ms, AgentStatus};

    fn agent(id: &str) -> Agent {
        let now = now_ms();
        Agent {
            id: id.into(),
            organization_id: "org_1".into(),
            name: "Reception".into(),
            role: None,
            ai_persona_name: None,
            system_prompt: "Answer calls.".into(),
            full_prompt: "Answer calls.".into(),
            prompt_version: now,
            config: json!({}),
            language: "en-US".into(),
            greeting: "Hello".into(),
            farewell: "Bye".into(),
            phone_country_code: Some("+1".into()),
            phone_number: Some("+15550100".into()),
            phone_location: None,
            status: AgentStatus::Active,
            enable_contextual_enrichment: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = AgentStore::new(Arc::new(MemoryDb::new()));
        store.insert(&agent("a1")).await.unwrap();

        let loaded = store.get("a1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Reception");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_phone() {
        let store = AgentStore::new(Arc::new(MemoryDb::new()));
        store.insert(&agent("a1")).await.unwrap();

        let loaded = store
            .get_by_phone("+15550100", Some("active"))
            .await
            .unwrap();
        assert!(loaded.is_some());

        let none = store
            .get_by_phone("+15550100", Some("inactive"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_patch_updates_fields() {
        let store = AgentStore::new(Arc::new(MemoryDb::new()));
        store.insert(&agent("a1")).await.unwrap();

        let patch = AgentPatch {
            greeting: Some("Namaste".into()),
            ..Default::default()
        };
        let updated = store.patch(&"a1".to_string(), &patch).await.unwrap().unwrap();
        assert_eq!(updated.greeting, "Namaste");
        assert_eq!(updated.farewell, "Bye");
    }
}
