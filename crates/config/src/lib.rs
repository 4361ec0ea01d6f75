//! Configuration for the voice agent runtime
//!
//! Settings load from `config/default` plus an optional environment file and
//! `VAANI__`-prefixed environment variables. Centralized operational
//! constants live in [`constants`].

pub mod constants;
pub mod settings;
pub mod telemetry;

pub use settings::{
    load_settings, DatabaseSettings, IngestionSettings, ObservabilitySettings, RagSettings,
    RuntimeEnvironment, Settings, SttSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<ConfigError> for vaani_core::Error {
    fn from(err: ConfigError) -> Self {
        vaani_core::Error::Config(err.to_string())
    }
}
