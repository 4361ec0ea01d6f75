//! Built-in tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{CallContext, Tool, ToolResult};
use vaani_rag::{BusinessInfoType, VoiceKnowledgeService};

/// Spoken fallback when retrieval finds nothing useful. A weak RAG result
/// is a successful tool call with this message, never an error.
pub const NOT_FOUND_MESSAGE: &str = "I couldn't find specific information about that.";

fn query_arg(args: &Value) -> Option<String> {
    args.get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

/// `search_knowledge`: semantic search over the agent's namespace
pub struct SearchKnowledgeTool {
    knowledge: Arc<VoiceKnowledgeService>,
}

impl SearchKnowledgeTool {
    pub fn new(knowledge: Arc<VoiceKnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn name(&self) -> &str {
        "search_knowledge"
    }

    fn description(&self) -> &str {
        "Search the business knowledge base for information relevant to the caller's question."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look up" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 10 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &CallContext) -> ToolResult {
        let Some(query) = query_arg(&args) else {
            return ToolResult::ok(NOT_FOUND_MESSAGE);
        };
        let limit = args.get("limit").and_then(Value::as_u64).map(|l| l as usize);

        match self.knowledge.search(&query, limit).await {
            Ok(response) if !response.is_empty() => {
                let text = response.text().to_string();
                ToolResult::ok_with_data(
                    text,
                    json!({
                        "expanded": response.expanded,
                        "info_type": response.info_type,
                        "results": response.response.results.len(),
                    }),
                )
            }
            Ok(_) => ToolResult::ok(NOT_FOUND_MESSAGE),
            Err(e) => {
                tracing::warn!(error = %e, "knowledge search failed");
                ToolResult::ok(NOT_FOUND_MESSAGE)
            }
        }
    }
}

/// `get_information`: search plus surrounding chunk context
pub struct GetInformationTool {
    knowledge: Arc<VoiceKnowledgeService>,
}

impl GetInformationTool {
    pub fn new(knowledge: Arc<VoiceKnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for GetInformationTool {
    fn name(&self) -> &str {
        "get_information"
    }

    fn description(&self) -> &str {
        "Retrieve detailed information with surrounding context for a specific topic."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &CallContext) -> ToolResult {
        let Some(query) = query_arg(&args) else {
            return ToolResult::ok(NOT_FOUND_MESSAGE);
        };

        match self.knowledge.search_with_context(&query, 3).await {
            Ok((response, context)) if !response.is_empty() => {
                ToolResult::ok_with_data(context, json!({ "results": response.response.results.len() }))
            }
            Ok(_) => ToolResult::ok(NOT_FOUND_MESSAGE),
            Err(e) => {
                tracing::warn!(error = %e, "contextual search failed");
                ToolResult::ok(NOT_FOUND_MESSAGE)
            }
        }
    }
}

/// `get_business_info`: enumerated business facts
pub struct GetBusinessInfoTool {
    knowledge: Arc<VoiceKnowledgeService>,
}

impl GetBusinessInfoTool {
    pub fn new(knowledge: Arc<VoiceKnowledgeService>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for GetBusinessInfoTool {
    fn name(&self) -> &str {
        "get_business_info"
    }

    fn description(&self) -> &str {
        "Look up a structured business fact: hours, location, contact, policies, features, or general."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "info_type": {
                    "type": "string",
                    "enum": ["hours", "location", "contact", "policies", "features", "general"]
                }
            },
            "required": ["info_type"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &CallContext) -> ToolResult {
        let info_type = match args.get("info_type").and_then(Value::as_str) {
            Some("hours") => BusinessInfoType::Hours,
            Some("location") => BusinessInfoType::Location,
            Some("contact") => BusinessInfoType::Contact,
            Some("policies") => BusinessInfoType::Policies,
            Some("features") => BusinessInfoType::Features,
            Some("general") => BusinessInfoType::General,
            other => {
                return ToolResult::fail(format!("unknown info_type: {:?}", other));
            }
        };

        match self.knowledge.get_business_info(info_type).await {
            Ok(Some(text)) => ToolResult::ok(text),
            Ok(None) => ToolResult::ok(NOT_FOUND_MESSAGE),
            Err(e) => {
                tracing::warn!(error = %e, "business info lookup failed");
                ToolResult::ok(NOT_FOUND_MESSAGE)
            }
        }
    }
}

/// `transfer_call`: records the request; the actual PSTN transfer is the
/// telephony bridge's job
pub struct TransferCallTool;

#[async_trait]
impl Tool for TransferCallTool {
    fn name(&self) -> &str {
        "transfer_call"
    }

    fn description(&self) -> &str {
        "Transfer the caller to a human agent or department."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "department": { "type": "string" },
                "reason": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &CallContext) -> ToolResult {
        let department = args
            .get("department")
            .and_then(Value::as_str)
            .unwrap_or("the right team");
        let reason = args.get("reason").and_then(Value::as_str).unwrap_or("");

        tracing::info!(
            session_id = ctx.session_id.as_str(),
            department,
            reason,
            "transfer requested"
        );

        ToolResult::ok_with_data(
            format!("Of course, let me transfer you to {}. One moment please.", department),
            json!({ "department": department, "reason": reason }),
        )
    }
}

/// `end_call`: schedules the session shutdown after the farewell grace
/// period
pub struct EndCallTool;

#[async_trait]
impl Tool for EndCallTool {
    fn name(&self) -> &str {
        "end_call"
    }

    fn description(&self) -> &str {
        "End the call politely once the caller's needs are met."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reason": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &CallContext) -> ToolResult {
        let reason = args
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("conversation complete");

        tracing::info!(session_id = ctx.session_id.as_str(), reason, "end_call requested");
        ctx.shutdown.schedule(reason);

        ToolResult::ok("Thank you for calling. Goodbye!")
    }
}
