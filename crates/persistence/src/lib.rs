//! Persistence layer for the voice agent runtime
//!
//! The underlying database is a document store addressed through an RPC
//! surface: `query`, `mutation`, and `action` over HTTP/JSON. Typed stores
//! wrap that surface per entity. `MemoryDb` implements the same surface
//! in-process for tests and development.

pub mod agents;
pub mod db;
pub mod documents;
pub mod error;
pub mod functions;
pub mod integrations;
pub mod interactions;
pub mod paths;
pub mod sessions;

pub use agents::AgentStore;
pub use db::{DocumentDb, HttpDb, HttpDbConfig, MemoryDb};
pub use documents::DocumentStore;
pub use error::PersistenceError;
pub use functions::{FunctionSchemaRegistry, UpsertAction};
pub use integrations::IntegrationStore;
pub use interactions::InteractionLog;
pub use sessions::CallSessionStore;

use std::sync::Arc;

/// Combined persistence layer with all typed stores sharing one database
/// connection.
#[derive(Clone)]
pub struct PersistenceLayer {
    pub agents: AgentStore,
    pub sessions: CallSessionStore,
    pub interactions: InteractionLog,
    pub documents: DocumentStore,
    pub functions: FunctionSchemaRegistry,
    pub integrations: IntegrationStore,
}

impl PersistenceLayer {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self {
            agents: AgentStore::new(db.clone()),
            sessions: CallSessionStore::new(db.clone()),
            interactions: InteractionLog::new(db.clone()),
            documents: DocumentStore::new(db.clone()),
            functions: FunctionSchemaRegistry::new(db.clone()),
            integrations: IntegrationStore::new(db),
        }
    }

    /// In-memory layer for tests
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryDb::new()))
    }
}
