//! Google Sheets plugin
//!
//! Targets a Google Apps Script endpoint. Columns are user-defined: each
//! maps a sheet column name to a source inside the execution context. A
//! connection test sends `_test` and `_setHeaders` with the configured
//! column names so the receiving script can create or repair the header
//! row.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::plugin::{
    resolve_path, ExecutionContext, HttpRequestSpec, IntegrationPlugin, PluginMetadata,
};
use crate::IntegrationError;
use vaani_core::TriggerType;

/// Where a column's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSource {
    Call,
    Transcript,
    Extracted,
    Agent,
    Static,
}

/// One user-defined sheet column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: String,
    pub source: ColumnSource,
    /// Dotted path within the source (or the literal value for `static`)
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SheetsConfig {
    #[serde(rename = "scriptUrl")]
    script_url: String,
    #[serde(rename = "sheetName", default)]
    sheet_name: Option<String>,
    columns: Vec<ColumnMapping>,
}

/// Google Apps Script sheet appender
pub struct GoogleSheetsPlugin;

impl GoogleSheetsPlugin {
    fn parse_config(config: &Value) -> Result<SheetsConfig, IntegrationError> {
        serde_json::from_value(config.clone())
            .map_err(|e| IntegrationError::Validation(e.to_string()))
    }

    fn resolve_column(column: &ColumnMapping, ctx: &ExecutionContext) -> Value {
        let resolved = match column.source {
            ColumnSource::Call => resolve_path(&ctx.call, &column.path).cloned(),
            ColumnSource::Agent => resolve_path(&ctx.agent, &column.path).cloned(),
            ColumnSource::Extracted => resolve_path(&ctx.extracted, &column.path).cloned(),
            ColumnSource::Transcript => ctx.transcript.clone().map(Value::String),
            ColumnSource::Static => Some(Value::String(column.path.clone())),
        };

        let value = resolved.unwrap_or_else(|| {
            Value::String(column.fallback.clone().unwrap_or_default())
        });

        match column.format.as_deref() {
            Some("duration_minutes") => value
                .as_u64()
                .map(|secs| Value::String(format!("{:.1}", secs as f64 / 60.0)))
                .unwrap_or(value),
            _ => value,
        }
    }
}

#[async_trait]
impl IntegrationPlugin for GoogleSheetsPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            id: "google_sheets".to_string(),
            name: "Google Sheets".to_string(),
            description: "Append a row per call to a Google Sheet via Apps Script".to_string(),
            category: "data".to_string(),
            supported_triggers: vec![
                TriggerType::CallEnded,
                TriggerType::TranscriptReady,
                TriggerType::IntentDetected,
            ],
            config_schema: json!({
                "type": "object",
                "properties": {
                    "scriptUrl": { "type": "string", "pattern": "^https://" },
                    "sheetName": { "type": "string" },
                    "columns": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "source": {
                                    "type": "string",
                                    "enum": ["call", "transcript", "extracted", "agent", "static"]
                                },
                                "path": { "type": "string" },
                                "format": { "type": "string" },
                                "fallback": { "type": "string" }
                            },
                            "required": ["name", "source"]
                        }
                    }
                },
                "required": ["scriptUrl", "columns"]
            }),
            icon: Some("sheets".to_string()),
            version: "1.0.0".to_string(),
            setup_instructions: Some(
                "Deploy the Apps Script as a web app and paste its URL here.".to_string(),
            ),
        }
    }

    fn transform_payload(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<Value, IntegrationError> {
        let config = Self::parse_config(config)?;

        let mut payload = Map::new();
        for column in &config.columns {
            payload.insert(column.name.clone(), Self::resolve_column(column, ctx));
        }
        payload.insert("callId".to_string(), json!(ctx.session_id));
        if let Some(sheet) = &config.sheet_name {
            payload.insert("_sheetName".to_string(), json!(sheet));
        }

        Ok(Value::Object(payload))
    }

    fn request_spec(
        &self,
        ctx: &ExecutionContext,
        config: &Value,
    ) -> Result<HttpRequestSpec, IntegrationError> {
        let parsed = Self::parse_config(config)?;
        let body = self.transform_payload(ctx, config)?;
        Ok(HttpRequestSpec {
            method: reqwest::Method::POST,
            url: parsed.script_url,
            headers: Vec::new(),
            body,
        })
    }

    /// Tests always carry the header handshake so a half-configured sheet
    /// heals on the next test.
    fn test_request_spec(&self, config: &Value) -> Result<HttpRequestSpec, IntegrationError> {
        let parsed = Self::parse_config(config)?;
        let headers: Vec<String> = parsed.columns.iter().map(|c| c.name.clone()).collect();

        let mut body = Map::new();
        body.insert("_test".to_string(), json!(true));
        body.insert("_setHeaders".to_string(), json!(true));
        body.insert("_headers".to_string(), json!(headers));
        if let Some(sheet) = &parsed.sheet_name {
            body.insert("_sheetName".to_string(), json!(sheet));
        }
        body.insert("callId".to_string(), json!("test"));

        Ok(HttpRequestSpec {
            method: reqwest::Method::POST,
            url: parsed.script_url,
            headers: Vec::new(),
            body: Value::Object(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::test_context;

    fn config() -> Value {
        json!({
            "scriptUrl": "https://script.google.com/macros/s/abc/exec",
            "sheetName": "Calls",
            "columns": [
                { "name": "Phone", "source": "call", "path": "phoneNumber" },
                { "name": "Agent", "source": "agent", "path": "name" },
                { "name": "Transcript", "source": "transcript" },
                { "name": "Campaign", "source": "static", "path": "spring-promo" },
                { "name": "Missing", "source": "extracted", "path": "nope", "fallback": "n/a" }
            ]
        })
    }

    #[test]
    fn test_validate_ok_and_missing_url() {
        let plugin = GoogleSheetsPlugin;
        assert!(plugin.validate_config(&config()).valid);

        let report = plugin.validate_config(&json!({ "columns": [] }));
        assert!(!report.valid);
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn test_transform_resolves_sources() {
        let plugin = GoogleSheetsPlugin;
        let payload = plugin.transform_payload(&test_context(), &config()).unwrap();

        assert_eq!(payload["Phone"], "+15550100");
        assert_eq!(payload["Agent"], "Test Agent");
        assert_eq!(payload["Transcript"], "This is a connection test.");
        assert_eq!(payload["Campaign"], "spring-promo");
        assert_eq!(payload["Missing"], "n/a");
        assert_eq!(payload["callId"], "test-session");
        assert_eq!(payload["_sheetName"], "Calls");
        assert!(payload.get("_test").is_none());
    }

    #[test]
    fn test_connection_payload_sets_headers() {
        let plugin = GoogleSheetsPlugin;
        let spec = plugin.test_request_spec(&config()).unwrap();

        assert_eq!(spec.body["_test"], true);
        assert_eq!(spec.body["_setHeaders"], true);
        let headers: Vec<&str> = spec.body["_headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h.as_str().unwrap())
            .collect();
        assert_eq!(headers, vec!["Phone", "Agent", "Transcript", "Campaign", "Missing"]);
    }

    #[test]
    fn test_duration_format() {
        let column = ColumnMapping {
            name: "Duration".into(),
            source: ColumnSource::Call,
            path: "durationSeconds".into(),
            format: Some("duration_minutes".into()),
            fallback: None,
        };
        let mut ctx = test_context();
        ctx.call = json!({ "durationSeconds": 90 });
        assert_eq!(GoogleSheetsPlugin::resolve_column(&column, &ctx), "1.5");
    }
}
