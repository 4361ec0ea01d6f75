//! Generic webhook plugin
//!
//! POST/PUT/PATCH with user headers and a templated JSON body. Template
//! strings use `{{dotted.path}}` placeholders resolved against the
//! execution context tree.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::plugin::{
    resolve_path, ExecutionContext, HttpRequestSpec, IntegrationPlugin, PluginMetadata,
};
use crate::IntegrationError;
use vaani_core::TriggerType;

pub struct WebhookPlugin;

impl WebhookPlugin {
    fn method(config: &Value) -> Result<reqwest::Method, IntegrationError> {
        match config.get("method").and_then(Value::as_str).unwrap_or("POST") {
            "POST" => Ok(reqwest::Method::POST),
            "PUT" => Ok(reqwest::Method::PUT),
            "PATCH" => Ok(reqwest::Method::PATCH),
            other => Err(IntegrationError::Validation(format!(
                "unsupported method: {}",
                other
            ))),
        }
    }

    /// Substitute `{{path}}` placeholders throughout a JSON template
    fn render_template(template: &Value, context: &Value) -> Value {
        match template {
            Value::String(s) => Value::String(render_string(s, context)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Self::render_template(item, context))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::render_template(v, context)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn render_string(template: &str, context: &Value) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let path = after[..end].trim();
                match resolve_path(context, path) {
                    Some(Value::String(s)) => output.push_str(s),
                    Some(other) => output.push_str(&other.to_string()),
                    None => {}
                }
                rest = &after[end + 2..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

#[async_trait]
impl IntegrationPlugin for WebhookPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            id: "webhook".to_string(),
            name: "Webhook".to_string(),
            description: "Send call data to any HTTP endpoint".to_string(),
            category: "developer".to_string(),
            supported_triggers: vec![
                TriggerType::CallStarted,
                TriggerType::CallEnded,
                TriggerType::TranscriptReady,
                TriggerType::IntentDetected,
                TriggerType::EscalationRequested,
                TriggerType::Custom,
            ],
            config_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "pattern": "^https?://" },
                    "method": { "type": "string", "enum": ["POST", "PUT", "PATCH"] },
                    "headers": { "type": "object", "additionalProperties": { "type": "string" } },
                    "bodyTemplate": { "type": "object" }
                },
                "required": ["url"]
            }),
            icon: Some("webhook".to_string()),
            version: "1.0.0".to_string(),
            setup_instructions: None,
        }
    }

    fn transform_payload(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<Value, IntegrationError> {
        let tree = ctx.as_value();
        match config.get("bodyTemplate") {
            Some(template) => Ok(Self::render_template(template, &tree)),
            // No template: ship the whole context.
            None => Ok(tree),
        }
    }

    fn request_spec(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<HttpRequestSpec, IntegrationError> {
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| IntegrationError::Validation("url is required".into()))?
            .to_string();
        let method = Self::method(config)?;
        let body = self.transform_payload(ctx, config)?;

        let headers = config
            .get("headers")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(HttpRequestSpec {
            method,
            url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::test_context;

    #[test]
    fn test_template_substitution() {
        let config = json!({
            "url": "https://example.com/hook",
            "bodyTemplate": {
                "caller": "{{call.phoneNumber}}",
                "agent": "{{agent.name}}",
                "note": "session {{sessionId}} ended",
                "missing": "{{extracted.nothing}}",
                "static": 42
            }
        });

        let payload = WebhookPlugin
            .transform_payload(&test_context(), &config)
            .unwrap();
        assert_eq!(payload["caller"], "+15550100");
        assert_eq!(payload["agent"], "Test Agent");
        assert_eq!(payload["note"], "session test-session ended");
        assert_eq!(payload["missing"], "");
        assert_eq!(payload["static"], 42);
    }

    #[test]
    fn test_no_template_ships_context() {
        let config = json!({ "url": "https://example.com/hook" });
        let payload = WebhookPlugin
            .transform_payload(&test_context(), &config)
            .unwrap();
        assert_eq!(payload["sessionId"], "test-session");
    }

    #[test]
    fn test_method_validation() {
        assert!(WebhookPlugin::method(&json!({ "method": "PUT" })).is_ok());
        assert!(WebhookPlugin::method(&json!({})).is_ok());
        assert!(WebhookPlugin::method(&json!({ "method": "DELETE" })).is_err());
    }

    #[test]
    fn test_headers_forwarded() {
        let config = json!({
            "url": "https://example.com/hook",
            "headers": { "X-Api-Key": "k123", "X-Ignored": 5 }
        });
        let spec = WebhookPlugin.request_spec(&test_context(), &config).unwrap();
        assert_eq!(spec.headers, vec![("X-Api-Key".to_string(), "k123".to_string())]);
    }
}
