//! Database RPC surface
//!
//! The runtime talks to a reactive document store through three verbs:
//! `query` (read), `mutation` (write), and `action` (side-effecting).
//! Functions are addressed by path (`table/operation`); arguments and
//! results are JSON. `HttpDb` is the production client; `MemoryDb`
//! implements the same dispatch in-process with the secondary indexes the
//! runtime relies on, for tests and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::error::PersistenceError;
use crate::paths;
use vaani_config::DatabaseSettings;

/// The query/mutation/action surface of the document store
#[async_trait]
pub trait DocumentDb: Send + Sync {
    async fn query(&self, path: &str, args: Value) -> Result<Value, PersistenceError>;
    async fn mutation(&self, path: &str, args: Value) -> Result<Value, PersistenceError>;
    async fn action(&self, path: &str, args: Value) -> Result<Value, PersistenceError>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpDbConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl From<&DatabaseSettings> for HttpDbConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            auth_token: settings.auth_token.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

/// HTTP/JSON client for the database surface
pub struct HttpDb {
    client: reqwest::Client,
    config: HttpDbConfig,
}

impl HttpDb {
    pub fn new(config: HttpDbConfig) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn call(&self, kind: &str, path: &str, args: Value) -> Result<Value, PersistenceError> {
        let url = format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), kind);
        let body = json!({ "path": path, "args": args, "format": "json" });

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(path, status = status.as_u16(), "database RPC rejected");
            return Err(PersistenceError::Rpc {
                path: path.to_string(),
                message: format!("{}: {}", status, message),
            });
        }

        let envelope: Value = response.json().await?;
        match envelope.get("status").and_then(Value::as_str) {
            Some("success") => Ok(envelope.get("value").cloned().unwrap_or(Value::Null)),
            _ => Err(PersistenceError::Rpc {
                path: path.to_string(),
                message: envelope
                    .get("errorMessage")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
        }
    }
}

#[async_trait]
impl DocumentDb for HttpDb {
    async fn query(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        self.call("query", path, args).await
    }

    async fn mutation(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        self.call("mutation", path, args).await
    }

    async fn action(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        self.call("action", path, args).await
    }
}

/// In-process implementation of the database surface
///
/// Tables are row vectors; "indexed" reads filter on the same fields the
/// production indexes cover (`by_agent_id`, `by_session_id`,
/// `by_organization_id`, `by_phone`, `by_function_name`, `by_domain`).
/// Writes take the table write-lock, so a batch insert is atomic.
pub struct MemoryDb {
    tables: RwLock<HashMap<&'static str, Vec<Value>>>,
    seq: AtomicU64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(1),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Remove every row from every table (test hook)
    pub fn reset(&self) {
        self.tables.write().clear();
    }

    /// Row count for a table (test hook)
    pub fn table_len(&self, table: &str) -> usize {
        self.tables.read().get(table).map(Vec::len).unwrap_or(0)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn insert_row(&self, table: &'static str, mut row: Value) -> Value {
        if let Some(obj) = row.as_object_mut() {
            obj.insert("_seq".into(), json!(self.next_seq()));
        }
        self.tables.write().entry(table).or_default().push(row);
        Value::Null
    }

    fn insert_rows(&self, table: &'static str, rows: Vec<Value>) -> usize {
        let mut tables = self.tables.write();
        let entry = tables.entry(table).or_default();
        let count = rows.len();
        for mut row in rows {
            if let Some(obj) = row.as_object_mut() {
                obj.insert("_seq".into(), json!(self.seq.fetch_add(1, Ordering::Relaxed)));
            }
            entry.push(row);
        }
        count
    }

    fn filter_rows<F>(&self, table: &str, predicate: F) -> Vec<Value>
    where
        F: Fn(&Value) -> bool,
    {
        self.tables
            .read()
            .get(table)
            .map(|rows| rows.iter().filter(|r| predicate(r)).cloned().collect())
            .unwrap_or_default()
    }

    fn delete_rows<F>(&self, table: &str, predicate: F) -> usize
    where
        F: Fn(&Value) -> bool,
    {
        let mut tables = self.tables.write();
        match tables.get_mut(table) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|r| !predicate(r));
                before - rows.len()
            }
            None => 0,
        }
    }

    fn dispatch(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        let field = |name: &str| -> Option<String> {
            args.get(name).and_then(Value::as_str).map(str::to_string)
        };
        let eq = |row: &Value, name: &str, value: &str| {
            row.get(name).and_then(Value::as_str) == Some(value)
        };

        let missing = |name: &str| PersistenceError::Rpc {
            path: path.to_string(),
            message: format!("missing argument: {}", name),
        };

        match path {
            // ---- agents ----
            paths::agents::INSERT => {
                let agent = args.get("agent").cloned().ok_or_else(|| missing("agent"))?;
                let id = agent
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing("agent.id"))?
                    .to_string();
                if !self.filter_rows("agents", |r| eq(r, "id", &id)).is_empty() {
                    return Err(PersistenceError::Conflict(format!("agent exists: {}", id)));
                }
                self.insert_row("agents", agent);
                Ok(json!({ "id": id }))
            }
            paths::agents::GET => {
                let id = field("id").ok_or_else(|| missing("id"))?;
                Ok(self
                    .filter_rows("agents", |r| eq(r, "id", &id))
                    .into_iter()
                    .next()
                    .unwrap_or(Value::Null))
            }
            paths::agents::GET_BY_PHONE => {
                let phone = field("phoneNumber").ok_or_else(|| missing("phoneNumber"))?;
                let status = field("status");
                Ok(self
                    .filter_rows("agents", |r| {
                        eq(r, "phone_number", &phone)
                            && status
                                .as_deref()
                                .map(|s| eq(r, "status", s))
                                .unwrap_or(true)
                    })
                    .into_iter()
                    .next()
                    .unwrap_or(Value::Null))
            }
            paths::agents::LIST_BY_ORGANIZATION => {
                let org = field("organizationId").ok_or_else(|| missing("organizationId"))?;
                Ok(Value::Array(
                    self.filter_rows("agents", |r| eq(r, "organization_id", &org)),
                ))
            }
            paths::agents::LIST_ALL => Ok(Value::Array(self.filter_rows("agents", |_| true))),
            paths::agents::PATCH => {
                let id = field("id").ok_or_else(|| missing("id"))?;
                let patch = args
                    .get("patch")
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or_else(|| missing("patch"))?;
                let mut tables = self.tables.write();
                let rows = tables.entry("agents").or_default();
                for row in rows.iter_mut() {
                    if row.get("id").and_then(Value::as_str) == Some(id.as_str()) {
                        if let Some(obj) = row.as_object_mut() {
                            for (k, v) in &patch {
                                obj.insert(k.clone(), v.clone());
                            }
                        }
                        return Ok(row.clone());
                    }
                }
                Ok(Value::Null)
            }
            paths::agents::DELETE => {
                let id = field("id").ok_or_else(|| missing("id"))?;
                let deleted = self.delete_rows("agents", |r| eq(r, "id", &id));
                Ok(json!({ "deleted": deleted }))
            }

            // ---- call sessions ----
            paths::call_sessions::INSERT => {
                let session = args.get("session").cloned().ok_or_else(|| missing("session"))?;
                self.insert_row("callSessions", session);
                Ok(Value::Null)
            }
            paths::call_sessions::GET => {
                let id = field("sessionId").ok_or_else(|| missing("sessionId"))?;
                Ok(self
                    .filter_rows("callSessions", |r| eq(r, "session_id", &id))
                    .into_iter()
                    .next()
                    .unwrap_or(Value::Null))
            }
            paths::call_sessions::PATCH => {
                let id = field("sessionId").ok_or_else(|| missing("sessionId"))?;
                let patch = args
                    .get("patch")
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or_else(|| missing("patch"))?;
                let mut tables = self.tables.write();
                let rows = tables.entry("callSessions").or_default();
                for row in rows.iter_mut() {
                    if row.get("session_id").and_then(Value::as_str) == Some(id.as_str()) {
                        if let Some(obj) = row.as_object_mut() {
                            for (k, v) in &patch {
                                obj.insert(k.clone(), v.clone());
                            }
                        }
                        return Ok(row.clone());
                    }
                }
                Ok(Value::Null)
            }
            paths::call_sessions::LIST_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(Value::Array(
                    self.filter_rows("callSessions", |r| eq(r, "agent_id", &agent)),
                ))
            }
            paths::call_sessions::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                let deleted = self.delete_rows("callSessions", |r| eq(r, "agent_id", &agent));
                Ok(json!({ "deleted": deleted }))
            }

            // ---- call interactions ----
            paths::call_interactions::INSERT => {
                let interaction = args
                    .get("interaction")
                    .cloned()
                    .ok_or_else(|| missing("interaction"))?;
                self.insert_row("callInteractions", interaction);
                Ok(Value::Null)
            }
            paths::call_interactions::INSERT_BATCH => {
                let items = args
                    .get("items")
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| missing("items"))?;
                let inserted = self.insert_rows("callInteractions", items);
                Ok(json!({ "inserted": inserted }))
            }
            paths::call_interactions::BY_SESSION => {
                let id = field("sessionId").ok_or_else(|| missing("sessionId"))?;
                let mut rows = self.filter_rows("callInteractions", |r| eq(r, "session_id", &id));
                sort_by_timestamp(&mut rows);
                Ok(Value::Array(rows))
            }
            paths::call_interactions::RECENT_BY_SESSION => {
                let id = field("sessionId").ok_or_else(|| missing("sessionId"))?;
                let limit = args
                    .get("limit")
                    .and_then(Value::as_u64)
                    .unwrap_or(20) as usize;
                let mut rows = self.filter_rows("callInteractions", |r| eq(r, "session_id", &id));
                sort_by_timestamp(&mut rows);
                rows.reverse();
                rows.truncate(limit);
                rows.reverse();
                Ok(Value::Array(rows))
            }
            paths::call_interactions::FUNCTION_CALLS_BY_SESSION => {
                let id = field("sessionId").ok_or_else(|| missing("sessionId"))?;
                let mut rows = self.filter_rows("callInteractions", |r| {
                    eq(r, "session_id", &id) && eq(r, "interaction_type", "function_call")
                });
                sort_by_timestamp(&mut rows);
                Ok(Value::Array(rows))
            }
            paths::call_interactions::COUNT_BY_SESSION => {
                let id = field("sessionId").ok_or_else(|| missing("sessionId"))?;
                let rows = self.filter_rows("callInteractions", |r| eq(r, "session_id", &id));
                let count_of = |kind: &str| {
                    rows.iter()
                        .filter(|r| eq(r, "interaction_type", kind))
                        .count()
                };
                Ok(json!({
                    "total": rows.len(),
                    "userMessages": count_of("user_message"),
                    "agentResponses": count_of("agent_response"),
                    "functionCalls": count_of("function_call"),
                }))
            }
            paths::call_interactions::UPDATE_SENTIMENT => {
                let id = field("interactionId").ok_or_else(|| missing("interactionId"))?;
                let sentiment = args
                    .get("sentiment")
                    .cloned()
                    .ok_or_else(|| missing("sentiment"))?;
                let mut tables = self.tables.write();
                let rows = tables.entry("callInteractions").or_default();
                for row in rows.iter_mut() {
                    if row.get("interaction_id").and_then(Value::as_str) == Some(id.as_str()) {
                        if let Some(obj) = row.as_object_mut() {
                            obj.insert("sentiment".into(), sentiment);
                        }
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            paths::call_interactions::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                let deleted = self.delete_rows("callInteractions", |r| eq(r, "agent_id", &agent));
                Ok(json!({ "deleted": deleted }))
            }

            // ---- simple insert/delete-by-agent tables ----
            paths::call_metrics::INSERT => {
                let row = args.get("metric").cloned().ok_or_else(|| missing("metric"))?;
                self.insert_row("callMetrics", row);
                Ok(Value::Null)
            }
            paths::call_metrics::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("callMetrics", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::documents::INSERT => {
                let row = args.get("document").cloned().ok_or_else(|| missing("document"))?;
                self.insert_row("documents", row);
                Ok(Value::Null)
            }
            paths::documents::GET => {
                let id = field("documentId").ok_or_else(|| missing("documentId"))?;
                Ok(self
                    .filter_rows("documents", |r| eq(r, "document_id", &id))
                    .into_iter()
                    .next()
                    .unwrap_or(Value::Null))
            }
            paths::documents::LIST_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(Value::Array(
                    self.filter_rows("documents", |r| eq(r, "agent_id", &agent)),
                ))
            }
            paths::documents::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("documents", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::chunks::INSERT_MANY => {
                let rows = args
                    .get("records")
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| missing("records"))?;
                Ok(json!({ "inserted": self.insert_rows("chunks", rows) }))
            }
            paths::chunks::LIST_BY_DOCUMENT => {
                let doc = field("documentId").ok_or_else(|| missing("documentId"))?;
                Ok(Value::Array(
                    self.filter_rows("chunks", |r| eq(r, "document_id", &doc)),
                ))
            }
            paths::chunks::DELETE_BY_DOCUMENT => {
                let doc = field("documentId").ok_or_else(|| missing("documentId"))?;
                Ok(json!({ "deleted": self.delete_rows("chunks", |r| eq(r, "document_id", &doc)) }))
            }
            paths::chunks::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("chunks", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::chunk_access_log::INSERT => {
                let row = args.get("entry").cloned().ok_or_else(|| missing("entry"))?;
                self.insert_row("chunkAccessLog", row);
                Ok(Value::Null)
            }
            paths::chunk_access_log::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("chunkAccessLog", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::ingestion_sessions::INSERT => {
                let row = args.get("session").cloned().ok_or_else(|| missing("session"))?;
                self.insert_row("ingestionSessions", row);
                Ok(Value::Null)
            }
            paths::ingestion_sessions::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("ingestionSessions", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::deleted_files::INSERT => {
                let row = args.get("file").cloned().ok_or_else(|| missing("file"))?;
                self.insert_row("deletedFiles", row);
                Ok(Value::Null)
            }
            paths::deleted_files::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("deletedFiles", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::deletion_queue::INSERT => {
                let row = args.get("item").cloned().ok_or_else(|| missing("item"))?;
                self.insert_row("deletionQueue", row);
                Ok(Value::Null)
            }
            paths::deletion_queue::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("deletionQueue", |r| eq(r, "agent_id", &agent)) }))
            }

            // ---- agent integrations ----
            paths::agent_integrations::INSERT => {
                let row = args
                    .get("integration")
                    .cloned()
                    .ok_or_else(|| missing("integration"))?;
                self.insert_row("agentIntegrations", row);
                Ok(Value::Null)
            }
            paths::agent_integrations::GET => {
                let id = field("integrationId").ok_or_else(|| missing("integrationId"))?;
                Ok(self
                    .filter_rows("agentIntegrations", |r| eq(r, "integration_id", &id))
                    .into_iter()
                    .next()
                    .unwrap_or(Value::Null))
            }
            paths::agent_integrations::LIST_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(Value::Array(
                    self.filter_rows("agentIntegrations", |r| eq(r, "agent_id", &agent)),
                ))
            }
            paths::agent_integrations::PATCH_STATUS => {
                let id = field("integrationId").ok_or_else(|| missing("integrationId"))?;
                let status = args.get("status").cloned().ok_or_else(|| missing("status"))?;
                let mut tables = self.tables.write();
                let rows = tables.entry("agentIntegrations").or_default();
                for row in rows.iter_mut() {
                    if row.get("integration_id").and_then(Value::as_str) == Some(id.as_str()) {
                        if let Some(obj) = row.as_object_mut() {
                            obj.insert("status".into(), status);
                        }
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            paths::agent_integrations::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("agentIntegrations", |r| eq(r, "agent_id", &agent)) }))
            }

            paths::integration_logs::INSERT => {
                let row = args.get("entry").cloned().ok_or_else(|| missing("entry"))?;
                self.insert_row("integrationLogs", row);
                Ok(Value::Null)
            }
            paths::integration_logs::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("integrationLogs", |r| eq(r, "agent_id", &agent)) }))
            }

            // ---- function schemas ----
            paths::function_schemas::INSERT => {
                let row = args.get("schema").cloned().ok_or_else(|| missing("schema"))?;
                let org = row
                    .get("organization_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing("schema.organization_id"))?
                    .to_string();
                let name = row
                    .get("function_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing("schema.function_name"))?
                    .to_string();
                let exists = !self
                    .filter_rows("functionSchemas", |r| {
                        eq(r, "organization_id", &org) && eq(r, "function_name", &name)
                    })
                    .is_empty();
                if exists {
                    return Err(PersistenceError::Conflict(format!(
                        "function exists: {}/{}",
                        org, name
                    )));
                }
                self.insert_row("functionSchemas", row);
                Ok(Value::Null)
            }
            paths::function_schemas::UPSERT => {
                let row = args.get("schema").cloned().ok_or_else(|| missing("schema"))?;
                let org = row
                    .get("organization_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let name = row
                    .get("function_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let mut tables = self.tables.write();
                let rows = tables.entry("functionSchemas").or_default();
                for existing in rows.iter_mut() {
                    let matches = existing.get("organization_id").and_then(Value::as_str)
                        == Some(org.as_str())
                        && existing.get("function_name").and_then(Value::as_str)
                            == Some(name.as_str());
                    if matches {
                        let created_at = existing.get("created_at").cloned();
                        let seq = existing.get("_seq").cloned();
                        *existing = row;
                        if let Some(obj) = existing.as_object_mut() {
                            if let Some(created) = created_at {
                                obj.insert("created_at".into(), created);
                            }
                            if let Some(seq) = seq {
                                obj.insert("_seq".into(), seq);
                            }
                        }
                        return Ok(json!({ "action": "updated" }));
                    }
                }
                let mut row = row;
                if let Some(obj) = row.as_object_mut() {
                    obj.insert("_seq".into(), json!(self.seq.fetch_add(1, Ordering::Relaxed)));
                }
                rows.push(row);
                Ok(json!({ "action": "created" }))
            }
            paths::function_schemas::LIST_BY_ORGANIZATION => {
                let org = field("organizationId").ok_or_else(|| missing("organizationId"))?;
                let active_only = args
                    .get("activeOnly")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(Value::Array(self.filter_rows("functionSchemas", |r| {
                    eq(r, "organization_id", &org)
                        && (!active_only || r.get("is_active").and_then(Value::as_bool) == Some(true))
                })))
            }
            paths::function_schemas::LIST_BY_DOMAIN => {
                let domain = field("domain").ok_or_else(|| missing("domain"))?;
                Ok(Value::Array(
                    self.filter_rows("functionSchemas", |r| eq(r, "domain", &domain)),
                ))
            }
            paths::function_schemas::TOGGLE_ACTIVE => {
                let org = field("organizationId").ok_or_else(|| missing("organizationId"))?;
                let name = field("functionName").ok_or_else(|| missing("functionName"))?;
                let active = args
                    .get("isActive")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| missing("isActive"))?;
                let mut tables = self.tables.write();
                let rows = tables.entry("functionSchemas").or_default();
                for row in rows.iter_mut() {
                    let matches = row.get("organization_id").and_then(Value::as_str)
                        == Some(org.as_str())
                        && row.get("function_name").and_then(Value::as_str) == Some(name.as_str());
                    if matches {
                        if let Some(obj) = row.as_object_mut() {
                            obj.insert("is_active".into(), json!(active));
                        }
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            paths::function_schemas::REMOVE => {
                let org = field("organizationId").ok_or_else(|| missing("organizationId"))?;
                let name = field("functionName").ok_or_else(|| missing("functionName"))?;
                let deleted = self.delete_rows("functionSchemas", |r| {
                    eq(r, "organization_id", &org) && eq(r, "function_name", &name)
                });
                Ok(json!({ "deleted": deleted }))
            }
            paths::function_schemas::REMOVE_BY_ORGANIZATION => {
                let org = field("organizationId").ok_or_else(|| missing("organizationId"))?;
                Ok(json!({ "deleted": self.delete_rows("functionSchemas", |r| eq(r, "organization_id", &org)) }))
            }

            paths::agent_knowledge_metadata::UPSERT => {
                let row = args.get("metadata").cloned().ok_or_else(|| missing("metadata"))?;
                let agent = row
                    .get("agent_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.delete_rows("agentKnowledgeMetadata", |r| eq(r, "agent_id", &agent));
                self.insert_row("agentKnowledgeMetadata", row);
                Ok(Value::Null)
            }
            paths::agent_knowledge_metadata::DELETE_BY_AGENT => {
                let agent = field("agentId").ok_or_else(|| missing("agentId"))?;
                Ok(json!({ "deleted": self.delete_rows("agentKnowledgeMetadata", |r| eq(r, "agent_id", &agent)) }))
            }

            _ => Err(PersistenceError::Rpc {
                path: path.to_string(),
                message: "unknown path".to_string(),
            }),
        }
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_by_timestamp(rows: &mut [Value]) {
    rows.sort_by_key(|r| {
        (
            r.get("timestamp").and_then(Value::as_i64).unwrap_or(0),
            r.get("_seq").and_then(Value::as_u64).unwrap_or(0),
        )
    });
}

#[async_trait]
impl DocumentDb for MemoryDb {
    async fn query(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        self.dispatch(path, args)
    }

    async fn mutation(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        self.dispatch(path, args)
    }

    async fn action(&self, path: &str, args: Value) -> Result<Value, PersistenceError> {
        self.dispatch(path, args)
    }
}
