//! Integration HTTP execution policy
//!
//! One place owns the outbound timeout and response classification:
//! 2xx succeeds, 4xx fails permanently, 5xx and transport errors fail
//! retryably. Retry scheduling itself lives outside the plugins entirely.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::plugin::{ConnectionTest, ExecutionContext, ExecutionResult, HttpRequestSpec};
use crate::registry::PluginRegistry;
use crate::IntegrationError;
use vaani_config::constants::timeouts;
use vaani_core::Integration;
use vaani_persistence::IntegrationStore;

static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeouts::PLUGIN_HTTP_MS))
        .build()
        .expect("integration HTTP client")
});

/// Classify a response status: (success, retryable)
pub fn classify_status(status: u16) -> (bool, bool) {
    match status {
        200..=299 => (true, false),
        500..=599 => (false, true),
        _ => (false, false),
    }
}

/// Send a plugin request and classify the outcome
pub async fn send(spec: HttpRequestSpec) -> ExecutionResult {
    let started = Instant::now();
    let request_echo = serde_json::json!({
        "method": spec.method.as_str(),
        "url": spec.url,
        "body": spec.body,
    });

    let mut request = HTTP.request(spec.method.clone(), &spec.url).json(&spec.body);
    for (name, value) in &spec.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let (success, retryable) = classify_status(status);
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let execution_time_ms = started.elapsed().as_millis() as u64;

            metrics::histogram!("integration_execution_ms").record(execution_time_ms as f64);

            ExecutionResult {
                success,
                data: success.then(|| body.clone()),
                execution_time_ms,
                request: Some(request_echo),
                response: Some(serde_json::json!({ "status": status, "body": body })),
                error: (!success).then(|| format!("target returned {}", status)),
                retryable,
            }
        }
        Err(e) => {
            let execution_time_ms = started.elapsed().as_millis() as u64;
            ExecutionResult {
                success: false,
                data: None,
                execution_time_ms,
                request: Some(request_echo),
                response: None,
                error: Some(e.to_string()),
                // Timeouts and transport failures are worth retrying.
                retryable: true,
            }
        }
    }
}

/// Send a connection-test request
pub async fn send_test(spec: HttpRequestSpec) -> ConnectionTest {
    let result = send(spec).await;
    ConnectionTest {
        success: result.success,
        message: match (&result.success, &result.error) {
            (true, _) => "connection ok".to_string(),
            (false, Some(error)) => error.clone(),
            (false, None) => "connection failed".to_string(),
        },
        latency_ms: result.execution_time_ms,
        details: result.response,
    }
}

/// Runs installed integrations for a trigger and records outcomes
pub struct IntegrationExecutor {
    registry: PluginRegistry,
    store: Option<IntegrationStore>,
}

impl IntegrationExecutor {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            store: None,
        }
    }

    pub fn with_store(mut self, store: IntegrationStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Execute one installed integration instance
    pub async fn run(
        &self,
        integration: &Integration,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult, IntegrationError> {
        let plugin = self
            .registry
            .get(&integration.tool_id)
            .ok_or_else(|| IntegrationError::UnknownPlugin(integration.tool_id.clone()))?;

        let result = plugin.execute(ctx, &integration.config).await;

        tracing::info!(
            integration_id = integration.integration_id.as_str(),
            plugin = integration.tool_id.as_str(),
            success = result.success,
            retryable = result.retryable,
            execution_time_ms = result.execution_time_ms,
            "integration executed"
        );

        if let Some(store) = &self.store {
            if let Err(e) = store
                .log_execution(
                    &integration.agent_id,
                    &integration.integration_id,
                    ctx.trigger,
                    result.success,
                    result.execution_time_ms,
                    result.error.as_deref(),
                )
                .await
            {
                tracing::warn!(error = %e, "failed to record integration log");
            }
        }

        Ok(result)
    }
}
