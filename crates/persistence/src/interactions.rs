//! Append-only interaction log
//!
//! One row per turn event. Rows are never updated except for the sentiment
//! tag; ordering inside a session follows `timestamp` ascending. Batch
//! writes go through a single mutation so they land atomically per session.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::DocumentDb;
use crate::error::PersistenceError;
use crate::paths;
use vaani_core::{
    now_ms, AgentId, CallInteraction, InteractionType, OrganizationId, Sentiment, SessionId,
};

pub use vaani_core::session::InteractionCounts;

/// Typed access to the interaction log
#[derive(Clone)]
pub struct InteractionLog {
    db: Arc<dyn DocumentDb>,
}

impl InteractionLog {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self { db }
    }

    pub async fn log_user_message(
        &self,
        session_id: &SessionId,
        organization_id: &OrganizationId,
        agent_id: Option<&AgentId>,
        text: &str,
    ) -> Result<String, PersistenceError> {
        let mut interaction = self.base(session_id, organization_id, agent_id, InteractionType::UserMessage);
        interaction.user_input = Some(text.to_string());
        interaction.sentiment = Some(tag_sentiment(text));
        self.insert(&interaction).await?;
        Ok(interaction.interaction_id)
    }

    pub async fn log_agent_response(
        &self,
        session_id: &SessionId,
        organization_id: &OrganizationId,
        agent_id: Option<&AgentId>,
        text: &str,
        latency_ms: Option<u64>,
    ) -> Result<String, PersistenceError> {
        let mut interaction =
            self.base(session_id, organization_id, agent_id, InteractionType::AgentResponse);
        interaction.agent_response = Some(text.to_string());
        interaction.latency_ms = latency_ms;
        self.insert(&interaction).await?;
        Ok(interaction.interaction_id)
    }

    pub async fn log_function_call(
        &self,
        session_id: &SessionId,
        organization_id: &OrganizationId,
        agent_id: Option<&AgentId>,
        function_name: &str,
        params: Value,
        result: Value,
        latency_ms: Option<u64>,
    ) -> Result<String, PersistenceError> {
        let mut interaction =
            self.base(session_id, organization_id, agent_id, InteractionType::FunctionCall);
        interaction.function_name = Some(function_name.to_string());
        interaction.function_params = Some(params);
        interaction.function_result = Some(result);
        interaction.latency_ms = latency_ms;
        self.insert(&interaction).await?;
        Ok(interaction.interaction_id)
    }

    /// Atomic per-session batch append
    pub async fn log_batch(&self, items: &[CallInteraction]) -> Result<usize, PersistenceError> {
        if items.is_empty() {
            return Ok(0);
        }
        let session_id = &items[0].session_id;
        if items.iter().any(|i| &i.session_id != session_id) {
            return Err(PersistenceError::Conflict(
                "batch must target a single session".to_string(),
            ));
        }

        let value = self
            .db
            .mutation(
                paths::call_interactions::INSERT_BATCH,
                json!({ "sessionId": session_id, "items": items }),
            )
            .await?;
        Ok(value.get("inserted").and_then(Value::as_u64).unwrap_or(0) as usize)
    }

    pub async fn update_sentiment(
        &self,
        interaction_id: &str,
        sentiment: Sentiment,
    ) -> Result<bool, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::call_interactions::UPDATE_SENTIMENT,
                json!({ "interactionId": interaction_id, "sentiment": sentiment }),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// All interactions for a session, timestamp ascending
    pub async fn get_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<CallInteraction>, PersistenceError> {
        let value = self
            .db
            .query(paths::call_interactions::BY_SESSION, json!({ "sessionId": session_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// The most recent `limit` interactions, returned ascending
    pub async fn get_recent_by_session(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<CallInteraction>, PersistenceError> {
        let value = self
            .db
            .query(
                paths::call_interactions::RECENT_BY_SESSION,
                json!({ "sessionId": session_id, "limit": limit }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_function_calls_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<CallInteraction>, PersistenceError> {
        let value = self
            .db
            .query(
                paths::call_interactions::FUNCTION_CALLS_BY_SESSION,
                json!({ "sessionId": session_id }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn count_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<InteractionCounts, PersistenceError> {
        let value = self
            .db
            .query(
                paths::call_interactions::COUNT_BY_SESSION,
                json!({ "sessionId": session_id }),
            )
            .await?;
        Ok(InteractionCounts {
            total: value.get("total").and_then(Value::as_u64).unwrap_or(0) as usize,
            user_messages: value.get("userMessages").and_then(Value::as_u64).unwrap_or(0) as usize,
            agent_responses: value
                .get("agentResponses")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
            function_calls: value
                .get("functionCalls")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
        })
    }

    pub async fn delete_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(
                paths::call_interactions::DELETE_BY_AGENT,
                json!({ "agentId": agent_id }),
            )
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    async fn insert(&self, interaction: &CallInteraction) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::call_interactions::INSERT,
                json!({ "interaction": interaction }),
            )
            .await?;
        Ok(())
    }

    fn base(
        &self,
        session_id: &SessionId,
        organization_id: &OrganizationId,
        agent_id: Option<&AgentId>,
        interaction_type: InteractionType,
    ) -> CallInteraction {
        CallInteraction {
            interaction_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            organization_id: organization_id.clone(),
            agent_id: agent_id.cloned(),
            interaction_type,
            timestamp: now_ms(),
            user_input: None,
            agent_response: None,
            function_name: None,
            function_params: None,
            function_result: None,
            latency_ms: None,
            sentiment: None,
        }
    }
}

/// Keyword sentiment tag for a user turn. Coarse on purpose: the tag feeds
/// dashboards, not the conversation.
pub fn tag_sentiment(text: &str) -> Sentiment {
    const NEGATIVE: &[&str] = &[
        "angry", "terrible", "awful", "worst", "refund", "cancel", "complaint", "frustrated",
        "useless", "scam",
    ];
    const POSITIVE: &[&str] = &[
        "thanks", "thank you", "great", "perfect", "awesome", "love", "excellent", "helpful",
    ];

    let lower = text.to_lowercase();
    let negative = NEGATIVE.iter().filter(|w| lower.contains(**w)).count();
    let positive = POSITIVE.iter().filter(|w| lower.contains(**w)).count();

    if negative > positive {
        Sentiment::Negative
    } else if positive > negative {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}
