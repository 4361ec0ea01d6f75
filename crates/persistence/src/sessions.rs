//! Call session store

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::DocumentDb;
use crate::error::PersistenceError;
use crate::paths;
use vaani_core::{now_ms, AgentId, CallSession, SessionId, SessionStatus};

/// Typed access to call sessions plus per-call metrics
#[derive(Clone)]
pub struct CallSessionStore {
    db: Arc<dyn DocumentDb>,
}

impl CallSessionStore {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self { db }
    }

    pub async fn create(&self, session: &CallSession) -> Result<(), PersistenceError> {
        self.db
            .mutation(paths::call_sessions::INSERT, json!({ "session": session }))
            .await?;
        Ok(())
    }

    pub async fn get(&self, session_id: &SessionId) -> Result<Option<CallSession>, PersistenceError> {
        let value = self
            .db
            .query(paths::call_sessions::GET, json!({ "sessionId": session_id }))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn update_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::call_sessions::PATCH,
                json!({ "sessionId": session_id, "patch": { "status": status } }),
            )
            .await?;
        Ok(())
    }

    /// Mark the session completed and stamp duration from `started_at`
    pub async fn end_session(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), PersistenceError> {
        let ended_at = now_ms();
        let duration = match self.get(session_id).await? {
            Some(session) => ((ended_at - session.started_at).max(0) / 1000) as u64,
            None => return Err(PersistenceError::NotFound(session_id.clone())),
        };

        self.db
            .mutation(
                paths::call_sessions::PATCH,
                json!({ "sessionId": session_id, "patch": {
                    "status": status,
                    "ended_at": ended_at,
                    "duration_seconds": duration,
                } }),
            )
            .await?;
        Ok(())
    }

    pub async fn list_by_agent(&self, agent_id: &AgentId) -> Result<Vec<CallSession>, PersistenceError> {
        let value = self
            .db
            .query(paths::call_sessions::LIST_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(paths::call_sessions::DELETE_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Append a per-call latency metric row
    pub async fn record_metric(
        &self,
        session_id: &SessionId,
        agent_id: Option<&AgentId>,
        name: &str,
        value_ms: u64,
    ) -> Result<(), PersistenceError> {
        self.db
            .mutation(
                paths::call_metrics::INSERT,
                json!({ "metric": {
                    "session_id": session_id,
                    "agent_id": agent_id,
                    "name": name,
                    "value_ms": value_ms,
                    "recorded_at": now_ms(),
                } }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_metrics_by_agent(&self, agent_id: &AgentId) -> Result<u64, PersistenceError> {
        let value = self
            .db
            .mutation(paths::call_metrics::DELETE_BY_AGENT, json!({ "agentId": agent_id }))
            .await?;
        Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}
