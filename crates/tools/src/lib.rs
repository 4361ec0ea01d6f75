//! LLM-callable tools
//!
//! A [`ToolContext`] maps tool names to implementations, validates
//! arguments against each tool's JSON schema, and persists every
//! invocation to the interaction log. Built-in tools cover knowledge
//! search, business info, transfer, and graceful call teardown; dynamic
//! tools are assembled from tenant function schemas.

pub mod builtin;
pub mod context;
pub mod dynamic;
pub mod shutdown;

pub use builtin::{
    EndCallTool, GetBusinessInfoTool, GetInformationTool, SearchKnowledgeTool, TransferCallTool,
    NOT_FOUND_MESSAGE,
};
pub use context::{ToolContext, ToolContextBuilder, ToolDefinition};
pub use dynamic::{DynamicDeps, DynamicTool};
pub use shutdown::ShutdownScheduler;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use vaani_core::{AgentId, OrganizationId, SessionId};

/// Tool execution errors (distinct from a tool returning `success: false`)
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl From<ToolError> for vaani_core::Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(msg) => vaani_core::Error::NotFound(msg),
            ToolError::InvalidArgs(msg) => vaani_core::Error::Validation(msg),
            ToolError::Execution(msg) => vaani_core::Error::Internal(msg),
        }
    }
}

/// Outcome handed back to the LLM
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(message.into()),
            error: None,
            data: None,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            result: Some(message.into()),
            error: None,
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
            data: None,
        }
    }
}

/// Per-call execution context shared by all tools
#[derive(Clone)]
pub struct CallContext {
    pub session_id: SessionId,
    pub organization_id: OrganizationId,
    pub agent_id: Option<AgentId>,
    pub shutdown: ShutdownScheduler,
}

impl CallContext {
    pub fn new(
        session_id: impl Into<SessionId>,
        organization_id: impl Into<OrganizationId>,
        agent_id: Option<AgentId>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            organization_id: organization_id.into(),
            agent_id,
            shutdown: ShutdownScheduler::new(),
        }
    }
}

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the arguments object
    fn parameters(&self) -> Value;

    async fn execute(&self, args: Value, ctx: &CallContext) -> ToolResult;
}
