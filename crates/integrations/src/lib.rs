//! Outbound integration plugins
//!
//! Each integration is a plugin implementing a fixed contract: metadata,
//! config validation, connection test, payload transformation, and
//! execution. The executor owns the HTTP policy (15 s timeout, status
//! classification); plugins only shape requests and signal retryability.

pub mod executor;
pub mod plugin;
pub mod registry;
pub mod sheets;
pub mod slack;
pub mod webhook;

pub use executor::{classify_status, IntegrationExecutor};
pub use plugin::{
    ConnectionTest, ExecutionContext, ExecutionResult, HttpRequestSpec, IntegrationPlugin,
    PluginMetadata, ValidationReport,
};
pub use registry::PluginRegistry;
pub use sheets::GoogleSheetsPlugin;
pub use slack::SlackPlugin;
pub use webhook::WebhookPlugin;

use thiserror::Error;

/// Integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Invalid config: {0}")]
    Validation(String),

    #[error("Payload transform failed: {0}")]
    Transform(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),
}

impl From<IntegrationError> for vaani_core::Error {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::Validation(msg) | IntegrationError::Transform(msg) => {
                vaani_core::Error::Validation(msg)
            }
            IntegrationError::Http(msg) => vaani_core::Error::TransientNetwork(msg),
            IntegrationError::UnknownPlugin(msg) => vaani_core::Error::NotFound(msg),
        }
    }
}
