//! Call sessions and interaction log entries
//!
//! Interactions are append-only and ordered by `timestamp` ascending within
//! a session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AgentId, EpochMs, OrganizationId, SessionId};

/// How the conversation reached the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Web,
    Inbound,
    Outbound,
}

/// Session progress state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ringing,
    Connected,
    Completed,
    Failed,
}

/// One telephone or web conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub session_id: SessionId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub call_type: CallType,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub started_at: EpochMs,
    #[serde(default)]
    pub ended_at: Option<EpochMs>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    pub status: SessionStatus,
}

/// Kind of turn event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    UserMessage,
    AgentResponse,
    FunctionCall,
}

/// Caller mood tag attached to a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Single turn event within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInteraction {
    pub interaction_id: String,
    pub session_id: SessionId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub interaction_type: InteractionType,
    pub timestamp: EpochMs,
    #[serde(default)]
    pub user_input: Option<String>,
    #[serde(default)]
    pub agent_response: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub function_params: Option<Value>,
    #[serde(default)]
    pub function_result: Option<Value>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
}

/// Per-session interaction counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub total: usize,
    pub user_messages: usize,
    pub agent_responses: usize,
    pub function_calls: usize,
}
