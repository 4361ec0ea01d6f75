//! RPC path names for the database surface
//!
//! Paths follow the `table/operation` convention. Both the HTTP client and
//! the in-memory emulator dispatch on these strings, so they live in one
//! place.

pub mod agents {
    pub const GET: &str = "agents/get";
    pub const GET_BY_PHONE: &str = "agents/getByPhone";
    pub const LIST_BY_ORGANIZATION: &str = "agents/listByOrganization";
    pub const LIST_ALL: &str = "agents/listAll";
    pub const INSERT: &str = "agents/insert";
    pub const PATCH: &str = "agents/patch";
    pub const DELETE: &str = "agents/delete";
}

pub mod call_sessions {
    pub const INSERT: &str = "callSessions/insert";
    pub const GET: &str = "callSessions/get";
    pub const PATCH: &str = "callSessions/patch";
    pub const LIST_BY_AGENT: &str = "callSessions/listByAgent";
    pub const DELETE_BY_AGENT: &str = "callSessions/deleteByAgent";
}

pub mod call_interactions {
    pub const INSERT: &str = "callInteractions/insert";
    pub const INSERT_BATCH: &str = "callInteractions/insertBatch";
    pub const BY_SESSION: &str = "callInteractions/bySession";
    pub const RECENT_BY_SESSION: &str = "callInteractions/recentBySession";
    pub const FUNCTION_CALLS_BY_SESSION: &str = "callInteractions/functionCallsBySession";
    pub const COUNT_BY_SESSION: &str = "callInteractions/countBySession";
    pub const UPDATE_SENTIMENT: &str = "callInteractions/updateSentiment";
    pub const DELETE_BY_AGENT: &str = "callInteractions/deleteByAgent";
}

pub mod call_metrics {
    pub const INSERT: &str = "callMetrics/insert";
    pub const DELETE_BY_AGENT: &str = "callMetrics/deleteByAgent";
}

pub mod documents {
    pub const INSERT: &str = "documents/insert";
    pub const GET: &str = "documents/get";
    pub const LIST_BY_AGENT: &str = "documents/listByAgent";
    pub const DELETE_BY_AGENT: &str = "documents/deleteByAgent";
}

pub mod chunks {
    pub const INSERT_MANY: &str = "chunks/insertMany";
    pub const LIST_BY_DOCUMENT: &str = "chunks/listByDocument";
    pub const DELETE_BY_DOCUMENT: &str = "chunks/deleteByDocument";
    pub const DELETE_BY_AGENT: &str = "chunks/deleteByAgent";
}

pub mod chunk_access_log {
    pub const INSERT: &str = "chunkAccessLog/insert";
    pub const DELETE_BY_AGENT: &str = "chunkAccessLog/deleteByAgent";
}

pub mod ingestion_sessions {
    pub const INSERT: &str = "ingestionSessions/insert";
    pub const DELETE_BY_AGENT: &str = "ingestionSessions/deleteByAgent";
}

pub mod deleted_files {
    pub const INSERT: &str = "deletedFiles/insert";
    pub const DELETE_BY_AGENT: &str = "deletedFiles/deleteByAgent";
}

pub mod deletion_queue {
    pub const INSERT: &str = "deletionQueue/insert";
    pub const DELETE_BY_AGENT: &str = "deletionQueue/deleteByAgent";
}

pub mod agent_integrations {
    pub const INSERT: &str = "agentIntegrations/insert";
    pub const GET: &str = "agentIntegrations/get";
    pub const LIST_BY_AGENT: &str = "agentIntegrations/listByAgent";
    pub const PATCH_STATUS: &str = "agentIntegrations/patchStatus";
    pub const DELETE_BY_AGENT: &str = "agentIntegrations/deleteByAgent";
}

pub mod integration_logs {
    pub const INSERT: &str = "integrationLogs/insert";
    pub const DELETE_BY_AGENT: &str = "integrationLogs/deleteByAgent";
}

pub mod function_schemas {
    pub const INSERT: &str = "functionSchemas/insert";
    pub const UPSERT: &str = "functionSchemas/upsert";
    pub const LIST_BY_ORGANIZATION: &str = "functionSchemas/listByOrganization";
    pub const LIST_BY_DOMAIN: &str = "functionSchemas/listByDomain";
    pub const TOGGLE_ACTIVE: &str = "functionSchemas/toggleActive";
    pub const REMOVE: &str = "functionSchemas/remove";
    pub const REMOVE_BY_ORGANIZATION: &str = "functionSchemas/removeByOrganization";
}

pub mod agent_knowledge_metadata {
    pub const UPSERT: &str = "agentKnowledgeMetadata/upsert";
    pub const DELETE_BY_AGENT: &str = "agentKnowledgeMetadata/deleteByAgent";
}
