//! Agent lifecycle and prompt caching
//!
//! Create/update/clone/delete for voice agents, the three-layer prompt
//! cache (agent config, full prompt, database), domain auto-detection, and
//! the deterministic 13-table cascade delete.

pub mod access_log;
pub mod domain;
pub mod lifecycle;
pub mod prompt_cache;

pub use access_log::ChunkAccessRecorder;
pub use domain::{build_full_prompt, AgentDomain};
pub use lifecycle::{
    AgentLifecycle, AgentUpdate, CascadeReport, CreateAgentRequest,
};
pub use prompt_cache::{PromptLookup, PromptService, PromptSource};

use thiserror::Error;

/// Agent service errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cascade step {step} ({table}) failed: {message}")]
    Cascade {
        step: usize,
        table: &'static str,
        message: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] vaani_persistence::PersistenceError),
}

impl From<AgentError> for vaani_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::NotFound(msg) => vaani_core::Error::NotFound(msg),
            AgentError::Validation(msg) => vaani_core::Error::Validation(msg),
            AgentError::Cascade { step, table, message } => vaani_core::Error::Integrity {
                step,
                message: format!("{}: {}", table, message),
            },
            AgentError::Store(e) => e.into(),
        }
    }
}
