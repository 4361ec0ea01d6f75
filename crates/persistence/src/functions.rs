//! Function schema registry
//!
//! Tenant-scoped dynamic tool definitions. Uniqueness on
//! `(organization_id, function_name)`; upsert is idempotent.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::DocumentDb;
use crate::error::PersistenceError;
use crate::paths;
use vaani_core::{FunctionSchema, OrganizationId};

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

/// Typed access to the function schema table
#[derive(Clone)]
pub struct FunctionSchemaRegistry {
    db: Arc<dyn DocumentDb>,
}

impl FunctionSchemaRegistry {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self { db }
    }

    /// Strict create; conflicts on an existing `(org, name)` pair
    pub async fn create(&self, schema: &FunctionSchema) -> Result<(), PersistenceError> {
        self.db
            .mutation(paths::function_schemas::INSERT, json!({ "schema": schema }))
            .await?;
        Ok(())
    }

    /// Idempotent write keyed by `(organization_id, function_name)`
    pub async fn upsert(&self, schema: &FunctionSchema) -> Result<UpsertAction, PersistenceError> {
        let value = self
            .db
            .mutation(paths::function_schemas::UPSERT, json!({ "schema": schema }))
            .await?;
        match value.get("action").and_then(Value::as_str) {
            Some("created") => Ok(UpsertAction::Created),
            Some("updated") => Ok(UpsertAction::Updated),
            other => Err(PersistenceError::Rpc {
                path: paths::function_schemas::UPSERT.to_string(),
                message: format!("unexpected action: {:?}", other),
            }),
        }
    }

    pub async fn list_by_organization(
        &self,
        organization_id: &OrganizationId,
        active_only: bool,
    ) -> Result<Vec<FunctionSchema>, PersistenceError> {
        let value = self
            .db
            .query(
                paths::function_schemas::LIST_BY_ORGANIZATION,
                json!({ "organizationId": organization_id, "activeOnly": active_only }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn list_by_domain(&self, domain: &str) -> Result<Vec<FunctionSchema>, PersistenceError> {
        let value = self
            .db
            .query(paths::function_schemas::LIST_BY_DOMAIN, json!({ "domain": domain }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn toggle_active(
        &self,
        organization_id: &OrganizationId,
        function_name: &str,
        is_active: bool,
    ) -> Result<bool, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::function_schemas::TOGGLE_ACTIVE,
                json!({
                    "organizationId": organization_id,
                    "functionName": function_name,
                    "isActive": is_active,
                }),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn remove(
        &self,
        organization_id: &OrganizationId,
        function_name: &str,
    ) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::function_schemas::REMOVE,
                json!({ "organizationId": organization_id, "functionName": function_name }),
            )
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn remove_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::function_schemas::REMOVE_BY_ORGANIZATION,
                json!({ "organizationId": organization_id }),
            )
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use vaani_core::{now_ms, HandlerType};

    fn schema(org: &str, name: &str) -> FunctionSchema {
        let now = now_ms();
        FunctionSchema {
            organization_id: org.into(),
            function_name: name.into(),
            domain: "retail".into(),
            description: "Check stock levels".into(),
            parameters: json!({
                "type": "object",
                "properties": { "sku": { "type": "string" } },
                "required": ["sku"],
            }),
            handler_type: HandlerType::Webhook,
            handler_config: json!({ "webhookUrl": "https://example.com/stock" }),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_twice_single_row() {
        let registry = FunctionSchemaRegistry::new(Arc::new(MemoryDb::new()));
        let s = schema("o1", "check_stock");

        assert_eq!(registry.upsert(&s).await.unwrap(), UpsertAction::Created);
        assert_eq!(registry.upsert(&s).await.unwrap(), UpsertAction::Updated);

        let all = registry.list_by_organization(&"o1".to_string(), false).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_create_conflicts() {
        let registry = FunctionSchemaRegistry::new(Arc::new(MemoryDb::new()));
        let s = schema("o1", "check_stock");
        registry.create(&s).await.unwrap();
        assert!(registry.create(&s).await.is_err());
    }

    #[tokio::test]
    async fn test_active_only_filter() {
        let registry = FunctionSchemaRegistry::new(Arc::new(MemoryDb::new()));
        registry.create(&schema("o1", "one")).await.unwrap();
        registry.create(&schema("o1", "two")).await.unwrap();
        registry
            .toggle_active(&"o1".to_string(), "two", false)
            .await
            .unwrap();

        let active = registry.list_by_organization(&"o1".to_string(), true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].function_name, "one");

        let all = registry.list_by_organization(&"o1".to_string(), false).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_by_organization() {
        let registry = FunctionSchemaRegistry::new(Arc::new(MemoryDb::new()));
        registry.create(&schema("o1", "one")).await.unwrap();
        registry.create(&schema("o1", "two")).await.unwrap();
        registry.create(&schema("o2", "three")).await.unwrap();

        assert_eq!(registry.remove_by_organization(&"o1".to_string()).await.unwrap(), 2);
        assert_eq!(
            registry.list_by_domain("retail").await.unwrap().len(),
            1
        );
    }
}
