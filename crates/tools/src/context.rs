//! Tool context
//!
//! The per-call tool map handed to the LLM. Arguments are validated
//! against each tool's JSON schema before execution, and every invocation
//! lands in the interaction log with its latency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::dynamic::{DynamicDeps, DynamicTool};
use crate::{CallContext, Tool, ToolError, ToolResult};
use vaani_core::FunctionSchema;
use vaani_persistence::InteractionLog;
use vaani_rag::VoiceKnowledgeService;

/// Definition surfaced to the LLM provider
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Name → tool map for one call
pub struct ToolContext {
    tools: HashMap<String, Arc<dyn Tool>>,
    interactions: Option<InteractionLog>,
}

impl ToolContext {
    pub fn builder() -> ToolContextBuilder {
        ToolContextBuilder::default()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate, execute, and persist one tool invocation
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: &CallContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        validate_args(&tool.parameters(), &args)?;

        let started = Instant::now();
        let result = tool.execute(args.clone(), ctx).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        if let Some(log) = &self.interactions {
            let outcome = serde_json::to_value(&result).unwrap_or(Value::Null);
            if let Err(e) = log
                .log_function_call(
                    &ctx.session_id,
                    &ctx.organization_id,
                    ctx.agent_id.as_ref(),
                    name,
                    args,
                    outcome,
                    Some(latency_ms),
                )
                .await
            {
                tracing::warn!(tool = name, error = %e, "failed to persist tool invocation");
            }
        }

        Ok(result)
    }
}

fn validate_args(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let compiled = jsonschema::JSONSchema::compile(schema)
        .map_err(|e| ToolError::InvalidArgs(format!("bad tool schema: {}", e)))?;

    if let Err(errors) = compiled.validate(args) {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(ToolError::InvalidArgs(messages.join("; ")));
    }
    Ok(())
}

/// Assembles the tool map: builtins, then dynamic tools from schemas
#[derive(Default)]
pub struct ToolContextBuilder {
    tools: Vec<Arc<dyn Tool>>,
    interactions: Option<InteractionLog>,
}

impl ToolContextBuilder {
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Register the built-in tool set for an agent
    pub fn with_builtins(mut self, knowledge: Arc<VoiceKnowledgeService>) -> Self {
        self.tools
            .push(Arc::new(crate::builtin::SearchKnowledgeTool::new(knowledge.clone())));
        self.tools
            .push(Arc::new(crate::builtin::GetInformationTool::new(knowledge.clone())));
        self.tools
            .push(Arc::new(crate::builtin::GetBusinessInfoTool::new(knowledge)));
        self.tools.push(Arc::new(crate::builtin::TransferCallTool));
        self.tools.push(Arc::new(crate::builtin::EndCallTool));
        self
    }

    /// Register dynamic tools from tenant schemas
    pub fn with_dynamic(mut self, schemas: Vec<FunctionSchema>, deps: &DynamicDeps) -> Self {
        self.tools.extend(DynamicTool::from_schemas(schemas, deps));
        self
    }

    pub fn with_interaction_log(mut self, log: InteractionLog) -> Self {
        self.interactions = Some(log);
        self
    }

    pub fn build(self) -> ToolContext {
        let mut tools = HashMap::new();
        for tool in self.tools {
            let name = tool.name().to_string();
            if tools.insert(name.clone(), tool).is_some() {
                // Last registration wins; tenant tools may shadow builtins.
                tracing::debug!(tool = name.as_str(), "tool name shadowed");
            }
        }
        ToolContext {
            tools,
            interactions: self.interactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaani_core::{now_ms, HandlerType};
    use vaani_persistence::MemoryDb;

    fn static_schema(name: &str) -> FunctionSchema {
        let now = now_ms();
        FunctionSchema {
            organization_id: "org_1".into(),
            function_name: name.into(),
            domain: "general".into(),
            description: "canned".into(),
            parameters: json!({
                "type": "object",
                "properties": { "topic": { "type": "string" } },
                "required": ["topic"]
            }),
            handler_type: HandlerType::Static,
            handler_config: json!({ "response": "canned answer" }),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx() -> CallContext {
        CallContext::new("s1", "org_1", Some("agent_1".to_string()))
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let context = ToolContext::builder().build();
        let result = context.execute("missing", json!({}), &ctx()).await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_schema_validation_rejects_bad_args() {
        let context = ToolContext::builder()
            .with_dynamic(vec![static_schema("canned")], &DynamicDeps::new())
            .build();

        // Missing the required "topic" field.
        let result = context.execute("canned", json!({}), &ctx()).await;
        assert!(matches!(result, Err(ToolError::InvalidArgs(_))));

        let ok = context
            .execute("canned", json!({ "topic": "anything" }), &ctx())
            .await
            .unwrap();
        assert!(ok.success);
    }

    #[tokio::test]
    async fn test_invocation_persisted() {
        let db = Arc::new(MemoryDb::new());
        let log = InteractionLog::new(db.clone());

        let context = ToolContext::builder()
            .with_dynamic(vec![static_schema("canned")], &DynamicDeps::new())
            .with_interaction_log(log.clone())
            .build();

        context
            .execute("canned", json!({ "topic": "hours" }), &ctx())
            .await
            .unwrap();

        let calls = log
            .get_function_calls_by_session(&"s1".to_string())
            .await
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name.as_deref(), Some("canned"));
        assert!(calls[0].latency_ms.is_some());
    }

    #[test]
    fn test_definitions_sorted() {
        let context = ToolContext::builder()
            .with_dynamic(
                vec![static_schema("zeta"), static_schema("alpha")],
                &DynamicDeps::new(),
            )
            .build();

        let definitions = context.definitions();
        assert_eq!(definitions[0].name, "alpha");
        assert_eq!(definitions[1].name, "zeta");
    }
}
