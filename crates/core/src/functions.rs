//! Tenant-scoped dynamic tool definitions
//!
//! Uniqueness is enforced on `(organization_id, function_name)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EpochMs, OrganizationId};

/// How a dynamic function executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    /// Semantic search over the agent's knowledge namespace
    VectorSearch,
    /// Read-only query against the database surface
    ConvexQuery,
    /// POST to a configured URL with session context
    Webhook,
    /// Canned response from `handler_config`
    Static,
}

/// Dynamic tool definition owned by a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub organization_id: OrganizationId,
    /// Unique per organization
    pub function_name: String,
    pub domain: String,
    pub description: String,
    /// JSON schema for the tool arguments
    pub parameters: Value,
    pub handler_type: HandlerType,
    pub handler_config: Value,
    pub is_active: bool,
    pub created_at: EpochMs,
    pub updated_at: EpochMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_type_serde() {
        assert_eq!(
            serde_json::to_string(&HandlerType::VectorSearch).unwrap(),
            "\"vector_search\""
        );
        let h: HandlerType = serde_json::from_str("\"convex_query\"").unwrap();
        assert_eq!(h, HandlerType::ConvexQuery);
    }
}
