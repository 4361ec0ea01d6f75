//! Slack incoming-webhook plugin
//!
//! Posts a block-kit summary of the call to a Slack channel.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::plugin::{ExecutionContext, HttpRequestSpec, IntegrationPlugin, PluginMetadata};
use crate::IntegrationError;
use vaani_core::TriggerType;

pub struct SlackPlugin;

impl SlackPlugin {
    fn webhook_url(config: &Value) -> Result<String, IntegrationError> {
        let url = config
            .get("webhookUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| IntegrationError::Validation("webhookUrl is required".into()))?;
        if !url.contains("hooks.slack.com") {
            return Err(IntegrationError::Validation(
                "webhookUrl must be a Slack incoming webhook".into(),
            ));
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl IntegrationPlugin for SlackPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            id: "slack".to_string(),
            name: "Slack".to_string(),
            description: "Post call summaries to a Slack channel".to_string(),
            category: "notifications".to_string(),
            supported_triggers: vec![
                TriggerType::CallStarted,
                TriggerType::CallEnded,
                TriggerType::EscalationRequested,
            ],
            config_schema: json!({
                "type": "object",
                "properties": {
                    "webhookUrl": { "type": "string", "pattern": "hooks\\.slack\\.com" },
                    "channel": { "type": "string" },
                    "username": { "type": "string" },
                    "iconEmoji": { "type": "string" }
                },
                "required": ["webhookUrl"]
            }),
            icon: Some("slack".to_string()),
            version: "1.0.0".to_string(),
            setup_instructions: Some(
                "Create an incoming webhook in your Slack workspace and paste its URL.".to_string(),
            ),
        }
    }

    fn transform_payload(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<Value, IntegrationError> {
        let phone = ctx
            .call
            .get("phoneNumber")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let duration = ctx
            .call
            .get("durationSeconds")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let agent_name = ctx.agent.get("name").and_then(Value::as_str).unwrap_or("Agent");
        let summary = format!(
            "Call {:?} for {} ({}), {} s",
            ctx.trigger, agent_name, phone, duration
        );

        let mut blocks = vec![
            json!({
                "type": "header",
                "text": { "type": "plain_text", "text": format!("{} — call update", agent_name) }
            }),
            json!({
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*Caller:*\n{}", phone) },
                    { "type": "mrkdwn", "text": format!("*Duration:*\n{} s", duration) },
                    { "type": "mrkdwn", "text": format!("*Trigger:*\n{:?}", ctx.trigger) },
                    { "type": "mrkdwn", "text": format!("*Session:*\n{}", ctx.session_id) }
                ]
            }),
        ];

        if let Some(transcript) = &ctx.transcript {
            let snippet: String = transcript.chars().take(500).collect();
            blocks.push(json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": format!("*Transcript:*\n>{}", snippet) }
            }));
        }

        let mut payload = json!({ "text": summary, "blocks": blocks });
        for (config_key, payload_key) in [
            ("channel", "channel"),
            ("username", "username"),
            ("iconEmoji", "icon_emoji"),
        ] {
            if let Some(value) = config.get(config_key).and_then(Value::as_str) {
                payload[payload_key] = json!(value);
            }
        }

        Ok(payload)
    }

    fn request_spec(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<HttpRequestSpec, IntegrationError> {
        let url = Self::webhook_url(config)?;
        let body = self.transform_payload(ctx, config)?;
        Ok(HttpRequestSpec {
            method: reqwest::Method::POST,
            url,
            headers: Vec::new(),
            body,
        })
    }
}
