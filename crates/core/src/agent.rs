//! Agent entity
//!
//! A tenant-scoped voice persona bound to a language, prompt, and optional
//! phone number. `full_prompt` is denormalized from `system_prompt` plus the
//! domain template; any write touching `system_prompt` must rebuild it and
//! set `prompt_version == updated_at`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AgentId, EpochMs, OrganizationId};

/// Agent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
}

/// Tenant-scoped voice persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub organization_id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Name the agent introduces itself with on the call
    #[serde(default)]
    pub ai_persona_name: Option<String>,
    pub system_prompt: String,
    /// Denormalized: system prompt merged with the domain template
    pub full_prompt: String,
    /// Monotonic timestamp bumped on every prompt-affecting write
    pub prompt_version: EpochMs,
    /// Opaque voice/language/pace configuration
    #[serde(default)]
    pub config: Value,
    /// BCP-47 language tag
    pub language: String,
    pub greeting: String,
    pub farewell: String,
    #[serde(default)]
    pub phone_country_code: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_location: Option<String>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub enable_contextual_enrichment: bool,
    pub created_at: EpochMs,
    pub updated_at: EpochMs,
}

/// Partial update applied by `AgentStore::patch`. `None` fields are left
/// untouched; prompt rebuild rules live in the lifecycle service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_persona_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<EpochMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farewell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_contextual_enrichment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<EpochMs>,
}

impl AgentPatch {
    /// True when the patch carries nothing to write
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().map(|o| o.is_empty()).unwrap_or(true))
            .unwrap_or(true)
    }

    /// Apply this patch onto an agent record in place
    pub fn apply(&self, agent: &mut Agent) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = &self.$field {
                    agent.$field = v.clone();
                }
            };
        }
        set!(name);
        set!(system_prompt);
        set!(full_prompt);
        set!(language);
        set!(greeting);
        set!(farewell);
        set!(config);
        if let Some(v) = &self.role {
            agent.role = Some(v.clone());
        }
        if let Some(v) = &self.ai_persona_name {
            agent.ai_persona_name = Some(v.clone());
        }
        if let Some(v) = &self.phone_country_code {
            agent.phone_country_code = Some(v.clone());
        }
        if let Some(v) = &self.phone_number {
            agent.phone_number = Some(v.clone());
        }
        if let Some(v) = &self.phone_location {
            agent.phone_location = Some(v.clone());
        }
        if let Some(v) = self.status {
            agent.status = v;
        }
        if let Some(v) = self.enable_contextual_enrichment {
            agent.enable_contextual_enrichment = v;
        }
        if let Some(v) = self.prompt_version {
            agent.prompt_version = v;
        }
        if let Some(v) = self.updated_at {
            agent.updated_at = v;
        }
    }
}
