//! Per-agent integration wiring

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AgentId, EpochMs};

/// Event class that causes the integration runtime to invoke matching plugins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    CallStarted,
    CallEnded,
    TranscriptReady,
    IntentDetected,
    EscalationRequested,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    #[default]
    Active,
    Disabled,
    Error,
}

/// Installed integration instance for one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub integration_id: String,
    pub agent_id: AgentId,
    /// Plugin id this instance is bound to
    pub tool_id: String,
    pub name: String,
    /// Opaque, plugin-validated configuration
    pub config: Value,
    pub enabled_triggers: Vec<TriggerType>,
    pub status: IntegrationStatus,
    pub created_at: EpochMs,
}

impl Integration {
    pub fn is_enabled_for(&self, trigger: TriggerType) -> bool {
        self.status == IntegrationStatus::Active && self.enabled_triggers.contains(&trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_serde() {
        assert_eq!(
            serde_json::to_string(&TriggerType::CallEnded).unwrap(),
            "\"call_ended\""
        );
    }

    #[test]
    fn test_enabled_for() {
        let integration = Integration {
            integration_id: "i1".into(),
            agent_id: "a1".into(),
            tool_id: "slack".into(),
            name: "Notify".into(),
            config: serde_json::json!({}),
            enabled_triggers: vec![TriggerType::CallEnded],
            status: IntegrationStatus::Active,
            created_at: 0,
        };
        assert!(integration.is_enabled_for(TriggerType::CallEnded));
        assert!(!integration.is_enabled_for(TriggerType::CallStarted));
    }
}
