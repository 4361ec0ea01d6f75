//! Dynamic tools from tenant function schemas
//!
//! A `FunctionSchema` row becomes a callable tool. Handler types:
//! `vector_search` routes through the knowledge service, `webhook` POSTs
//! the arguments plus session context, `convex_query` reads from the
//! database surface, and `static` returns a canned response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::{CallContext, Tool, ToolResult};
use vaani_config::constants::timeouts;
use vaani_core::{FunctionSchema, HandlerType};
use vaani_persistence::DocumentDb;
use vaani_rag::VoiceKnowledgeService;

/// Services dynamic handlers can reach
#[derive(Clone)]
pub struct DynamicDeps {
    pub knowledge: Option<Arc<VoiceKnowledgeService>>,
    pub db: Option<Arc<dyn DocumentDb>>,
    pub http: reqwest::Client,
}

impl DynamicDeps {
    pub fn new() -> Self {
        Self {
            knowledge: None,
            db: None,
            http: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeouts::PLUGIN_HTTP_MS))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<VoiceKnowledgeService>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_db(mut self, db: Arc<dyn DocumentDb>) -> Self {
        self.db = Some(db);
        self
    }
}

impl Default for DynamicDeps {
    fn default() -> Self {
        Self::new()
    }
}

/// One tenant-defined tool
pub struct DynamicTool {
    schema: FunctionSchema,
    deps: DynamicDeps,
}

impl DynamicTool {
    pub fn new(schema: FunctionSchema, deps: DynamicDeps) -> Self {
        Self { schema, deps }
    }

    /// Build tools from every active schema
    pub fn from_schemas(schemas: Vec<FunctionSchema>, deps: &DynamicDeps) -> Vec<Arc<dyn Tool>> {
        schemas
            .into_iter()
            .filter(|s| s.is_active)
            .map(|s| Arc::new(DynamicTool::new(s, deps.clone())) as Arc<dyn Tool>)
            .collect()
    }

    async fn run_vector_search(&self, args: &Value) -> ToolResult {
        let Some(knowledge) = &self.deps.knowledge else {
            return ToolResult::fail("knowledge service not available");
        };

        let query = args
            .get("query")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| collect_string_args(args));

        match knowledge.search(&query, None).await {
            Ok(response) if !response.is_empty() => {
                ToolResult::ok(response.text().to_string())
            }
            Ok(_) => ToolResult::ok(crate::builtin::NOT_FOUND_MESSAGE),
            Err(e) => {
                tracing::warn!(function = self.schema.function_name.as_str(), error = %e, "vector_search handler failed");
                ToolResult::ok(crate::builtin::NOT_FOUND_MESSAGE)
            }
        }
    }

    async fn run_webhook(&self, args: &Value, ctx: &CallContext) -> ToolResult {
        let Some(url) = self
            .schema
            .handler_config
            .get("webhookUrl")
            .and_then(Value::as_str)
        else {
            return ToolResult::fail("webhookUrl missing from handler config");
        };

        let mut body = match args.as_object() {
            Some(object) => object.clone(),
            None => Map::new(),
        };
        body.insert("_session".into(), json!({
            "sessionId": ctx.session_id,
            "organizationId": ctx.organization_id,
            "agentId": ctx.agent_id,
        }));

        let mut request = self.deps.http.post(url).json(&Value::Object(body));
        if let Some(headers) = self
            .schema
            .handler_config
            .get("headers")
            .and_then(Value::as_object)
        {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let payload: Value = response.json().await.unwrap_or(Value::Null);
                if status.is_success() {
                    ToolResult::ok_with_data("Done.", payload)
                } else {
                    ToolResult::fail(format!("webhook returned {}", status))
                }
            }
            Err(e) => ToolResult::fail(format!("webhook request failed: {}", e)),
        }
    }

    async fn run_convex_query(&self, args: &Value, ctx: &CallContext) -> ToolResult {
        let Some(db) = &self.deps.db else {
            return ToolResult::fail("database not available");
        };
        let Some(path) = self
            .schema
            .handler_config
            .get("path")
            .and_then(Value::as_str)
        else {
            return ToolResult::fail("path missing from handler config");
        };

        let mut query_args = match args.as_object() {
            Some(object) => object.clone(),
            None => Map::new(),
        };
        query_args.insert("organizationId".into(), json!(ctx.organization_id));

        match db.query(path, Value::Object(query_args)).await {
            Ok(value) => ToolResult::ok_with_data("Done.", value),
            Err(e) => ToolResult::fail(format!("query failed: {}", e)),
        }
    }

    fn run_static(&self) -> ToolResult {
        let response = self
            .schema
            .handler_config
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or("Okay.");
        ToolResult::ok(response.to_string())
    }
}

fn collect_string_args(args: &Value) -> String {
    args.as_object()
        .map(|object| {
            object
                .values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for DynamicTool {
    fn name(&self) -> &str {
        &self.schema.function_name
    }

    fn description(&self) -> &str {
        &self.schema.description
    }

    fn parameters(&self) -> Value {
        self.schema.parameters.clone()
    }

    async fn execute(&self, args: Value, ctx: &CallContext) -> ToolResult {
        match self.schema.handler_type {
            HandlerType::VectorSearch => self.run_vector_search(&args).await,
            HandlerType::Webhook => self.run_webhook(&args, ctx).await,
            HandlerType::ConvexQuery => self.run_convex_query(&args, ctx).await,
            HandlerType::Static => self.run_static(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaani_core::now_ms;
    use vaani_persistence::MemoryDb;
    use vaani_rag::{AddRequest, HashEmbedder, MemoryVectorBackend, RagIndex, VoiceSearchConfig};
    use vaani_text::Tokenizer;

    fn schema(name: &str, handler_type: HandlerType, handler_config: Value) -> FunctionSchema {
        let now = now_ms();
        FunctionSchema {
            organization_id: "org_1".into(),
            function_name: name.into(),
            domain: "general".into(),
            description: "test function".into(),
            parameters: json!({ "type": "object", "properties": { "query": { "type": "string" } } }),
            handler_type,
            handler_config,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx() -> CallContext {
        CallContext::new("s1", "org_1", Some("agent_1".to_string()))
    }

    #[tokio::test]
    async fn test_static_handler() {
        let tool = DynamicTool::new(
            schema("say_hi", HandlerType::Static, json!({ "response": "Hi there!" })),
            DynamicDeps::new(),
        );
        let result = tool.execute(json!({}), &ctx()).await;
        assert!(result.success);
        assert_eq!(result.result.unwrap(), "Hi there!");
    }

    #[tokio::test]
    async fn test_vector_search_handler() {
        let index = Arc::new(RagIndex::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::new(128)),
        ));
        index
            .add(AddRequest {
                namespace: "agent_1".into(),
                key: Some("k1".into()),
                text: "warranty covers two years of defects".into(),
                title: None,
                chunk_index: None,
            })
            .await
            .unwrap();
        let knowledge = Arc::new(VoiceKnowledgeService::new(
            index,
            Arc::new(Tokenizer::with_cache_capacity(512).unwrap()),
            "agent_1",
            "org_1",
            VoiceSearchConfig {
                similarity_threshold: 0.05,
                default_limit: 5,
            },
        ));

        let tool = DynamicTool::new(
            schema("check_warranty", HandlerType::VectorSearch, json!({})),
            DynamicDeps::new().with_knowledge(knowledge),
        );
        let result = tool
            .execute(json!({ "query": "warranty defects" }), &ctx())
            .await;
        assert!(result.success);
        assert!(result.result.unwrap().contains("warranty"));
    }

    #[tokio::test]
    async fn test_convex_query_handler_scopes_org() {
        let db = Arc::new(MemoryDb::new());
        // Seed a schema row the query can read back.
        db.mutation(
            "functionSchemas/upsert",
            json!({ "schema": {
                "organization_id": "org_1", "function_name": "f1",
                "domain": "general", "is_active": true,
            } }),
        )
        .await
        .unwrap();

        let tool = DynamicTool::new(
            schema(
                "list_functions",
                HandlerType::ConvexQuery,
                json!({ "path": "functionSchemas/listByOrganization" }),
            ),
            DynamicDeps::new().with_db(db),
        );

        let result = tool.execute(json!({}), &ctx()).await;
        assert!(result.success);
        let rows = result.data.unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_missing_url() {
        let tool = DynamicTool::new(
            schema("hook", HandlerType::Webhook, json!({})),
            DynamicDeps::new(),
        );
        let result = tool.execute(json!({}), &ctx()).await;
        assert!(!result.success);
    }

    #[test]
    fn test_inactive_schemas_filtered() {
        let mut inactive = schema("off", HandlerType::Static, json!({}));
        inactive.is_active = false;
        let active = schema("on", HandlerType::Static, json!({}));

        let tools = DynamicTool::from_schemas(vec![inactive, active], &DynamicDeps::new());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "on");
    }
}
