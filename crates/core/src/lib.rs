//! Core types for the voice agent runtime
//!
//! This crate provides foundational types used across all other crates:
//! - Tenant-scoped entity model (agents, documents, chunks, sessions)
//! - Call session and interaction types
//! - Audio frame types
//! - Error taxonomy shared by every service

pub mod agent;
pub mod audio;
pub mod error;
pub mod functions;
pub mod integration;
pub mod knowledge;
pub mod session;
pub mod time;

pub use agent::{Agent, AgentPatch, AgentStatus};
pub use audio::{AudioEncoding, AudioFrame, SampleRate};
pub use error::{Error, Result};
pub use functions::{FunctionSchema, HandlerType};
pub use integration::{Integration, IntegrationStatus, TriggerType};
pub use knowledge::{ChunkRecord, Document, EntryStatus};
pub use session::{
    CallInteraction, CallSession, CallType, InteractionType, Sentiment, SessionStatus,
};
pub use time::now_ms;

/// Stable identifier types. These are opaque strings issued by the database
/// surface; the runtime never parses them.
pub type AgentId = String;
pub type OrganizationId = String;
pub type DocumentId = String;
pub type SessionId = String;
pub type EntryId = String;

/// Epoch milliseconds, the persisted timestamp representation.
pub type EpochMs = i64;
