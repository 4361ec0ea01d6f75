//! Plugin contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::executor;
use crate::IntegrationError;
use vaani_core::TriggerType;

/// Static plugin description shown in the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub supported_triggers: Vec<TriggerType>,
    /// JSON schema the instance config must satisfy
    pub config_schema: Value,
    #[serde(default)]
    pub icon: Option<String>,
    pub version: String,
    #[serde(default)]
    pub setup_instructions: Option<String>,
}

/// Config validation outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Connection test outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    pub latency_ms: u64,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Call data handed to a plugin when a trigger fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub session_id: String,
    pub organization_id: String,
    pub agent_id: Option<String>,
    pub trigger: TriggerType,
    /// Call summary: phone, duration, status, timestamps
    pub call: Value,
    /// Agent summary: name, persona, language
    pub agent: Value,
    #[serde(default)]
    pub transcript: Option<String>,
    /// Structured values extracted during the call
    #[serde(default)]
    pub extracted: Value,
}

impl ExecutionContext {
    /// The whole context as one JSON tree for path lookups
    pub fn as_value(&self) -> Value {
        json!({
            "sessionId": self.session_id,
            "organizationId": self.organization_id,
            "agentId": self.agent_id,
            "trigger": self.trigger,
            "call": self.call,
            "agent": self.agent,
            "transcript": self.transcript,
            "extracted": self.extracted,
        })
    }
}

/// Execution outcome. `retryable` tells the scheduler whether a retry has
/// any chance; the plugin never retries on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub request: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub retryable: bool,
}

/// Outbound HTTP request shape produced by a plugin
#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

/// The plugin contract
#[async_trait]
pub trait IntegrationPlugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    /// Validate instance config against the plugin's schema
    fn validate_config(&self, config: &Value) -> ValidationReport {
        let schema = self.metadata().config_schema;
        let compiled = match jsonschema::JSONSchema::compile(&schema) {
            Ok(compiled) => compiled,
            Err(e) => return ValidationReport::invalid(vec![format!("bad schema: {}", e)]),
        };
        let result = match compiled.validate(config) {
            Ok(()) => ValidationReport::ok(),
            Err(errors) => ValidationReport::invalid(errors.map(|e| e.to_string()).collect()),
        };
        result
    }

    /// Build the outbound payload for a trigger firing
    fn transform_payload(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<Value, IntegrationError>;

    /// Full request shape: method, URL, headers, and the transformed body
    fn request_spec(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<HttpRequestSpec, IntegrationError>;

    /// Request used by `test_connection`; defaults to the normal request
    /// built from a synthetic context
    fn test_request_spec(&self, config: &Value) -> Result<HttpRequestSpec, IntegrationError> {
        self.request_spec(&test_context(), config)
    }

    /// Probe the configured target
    async fn test_connection(&self, config: &Value) -> ConnectionTest {
        let report = self.validate_config(config);
        if !report.valid {
            return ConnectionTest {
                success: false,
                message: format!("invalid config: {}", report.errors.join("; ")),
                latency_ms: 0,
                details: None,
            };
        }

        let spec = match self.test_request_spec(config) {
            Ok(spec) => spec,
            Err(e) => {
                return ConnectionTest {
                    success: false,
                    message: e.to_string(),
                    latency_ms: 0,
                    details: None,
                }
            }
        };

        executor::send_test(spec).await
    }

    /// Validate → transform → HTTP, with the executor's timeout and
    /// classification policy
    async fn execute(&self, ctx: &ExecutionContext, config: &Value) -> ExecutionResult {
        let report = self.validate_config(config);
        if !report.valid {
            return ExecutionResult {
                success: false,
                data: None,
                execution_time_ms: 0,
                request: None,
                response: None,
                error: Some(format!("invalid config: {}", report.errors.join("; "))),
                retryable: false,
            };
        }

        let spec = match self.request_spec(ctx, config) {
            Ok(spec) => spec,
            Err(e) => {
                return ExecutionResult {
                    success: false,
                    data: None,
                    execution_time_ms: 0,
                    request: None,
                    response: None,
                    error: Some(e.to_string()),
                    retryable: false,
                }
            }
        };

        executor::send(spec).await
    }
}

/// Synthetic context used for connection tests
pub fn test_context() -> ExecutionContext {
    ExecutionContext {
        session_id: "test-session".to_string(),
        organization_id: "test-org".to_string(),
        agent_id: None,
        trigger: TriggerType::Custom,
        call: json!({
            "phoneNumber": "+15550100",
            "durationSeconds": 0,
            "status": "completed",
        }),
        agent: json!({ "name": "Test Agent" }),
        transcript: Some("This is a connection test.".to_string()),
        extracted: json!({}),
    }
}

/// Resolve a dotted path (`call.phoneNumber`) inside a JSON tree
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}
