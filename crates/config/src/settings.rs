//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{cache, endpoints, rag, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub stt: SttSettings,

    #[serde(default)]
    pub rag: RagSettings,

    #[serde(default)]
    pub ingestion: IngestionSettings,

    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Database RPC surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Base URL of the query/mutation/action surface
    #[serde(default = "default_db_url")]
    pub url: String,

    /// Bearer token (env: VAANI__DATABASE__AUTH_TOKEN)
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_db_timeout")]
    pub timeout_seconds: u64,
}

fn default_db_url() -> String {
    endpoints::DB_DEFAULT.to_string()
}
fn default_db_timeout() -> u64 {
    10
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            auth_token: None,
            timeout_seconds: default_db_timeout(),
        }
    }
}

/// Streaming STT settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// Vendor WebSocket endpoint
    #[serde(default = "default_stt_url")]
    pub ws_url: String,

    /// Subscription key (env: VAANI__STT__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model
    #[serde(default = "default_stt_model")]
    pub model: String,

    /// Connections opened eagerly per pool at startup
    #[serde(default)]
    pub prewarm_connections: usize,

    /// Connect timeout in milliseconds
    #[serde(default = "default_stt_connect_ms")]
    pub connect_timeout_ms: u64,

    /// Enable high VAD sensitivity on the vendor side
    #[serde(default)]
    pub high_vad_sensitivity: bool,

    /// Emit interim transcripts when the vendor supports them
    #[serde(default)]
    pub interim_results: bool,
}

fn default_stt_url() -> String {
    endpoints::STT_WS_DEFAULT.to_string()
}
fn default_stt_model() -> String {
    "saarika:v2".to_string()
}
fn default_stt_connect_ms() -> u64 {
    timeouts::STT_CONNECT_MS
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            ws_url: default_stt_url(),
            api_key: None,
            model: default_stt_model(),
            prewarm_connections: 0,
            connect_timeout_ms: default_stt_connect_ms(),
            high_vad_sensitivity: false,
            interim_results: false,
        }
    }
}

/// RAG settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Embedding API endpoint
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimension
    #[serde(default = "default_vector_dim")]
    pub vector_dim: usize,

    /// Qdrant endpoint (when the Qdrant backend is selected)
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant API key
    #[serde(default)]
    pub qdrant_api_key: Option<String>,

    /// Shared collection name; namespaces partition it per agent
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Minimum similarity score to include a result
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Default result count
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Result cache TTL in seconds
    #[serde(default = "default_result_ttl")]
    pub result_cache_ttl_secs: u64,
}

fn default_embedding_url() -> String {
    endpoints::EMBEDDING_DEFAULT.to_string()
}
fn default_embedding_model() -> String {
    "qwen3-embedding:0.6b".to_string()
}
fn default_vector_dim() -> usize {
    1024
}
fn default_qdrant_url() -> String {
    endpoints::QDRANT_DEFAULT.to_string()
}
fn default_collection() -> String {
    "agent_knowledge".to_string()
}
fn default_score_threshold() -> f32 {
    rag::DEFAULT_SCORE_THRESHOLD
}
fn default_search_limit() -> usize {
    rag::DEFAULT_LIMIT
}
fn default_result_ttl() -> u64 {
    cache::RESULT_CACHE_TTL_SECS
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            embedding_url: default_embedding_url(),
            embedding_model: default_embedding_model(),
            vector_dim: default_vector_dim(),
            qdrant_url: default_qdrant_url(),
            qdrant_api_key: None,
            collection: default_collection(),
            score_threshold: default_score_threshold(),
            search_limit: default_search_limit(),
            result_cache_ttl_secs: default_result_ttl(),
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Remote parser service; empty disables remote parsing entirely
    #[serde(default = "default_parser_url")]
    pub parser_url: String,

    /// Concurrent vector inserts per document
    #[serde(default = "default_insert_batch")]
    pub insert_batch_size: usize,
}

fn default_parser_url() -> String {
    endpoints::PARSER_DEFAULT.to_string()
}
fn default_insert_batch() -> usize {
    crate::constants::ingest::INSERT_BATCH_SIZE
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            parser_url: default_parser_url(),
            insert_batch_size: default_insert_batch(),
        }
    }
}

/// Observability settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.rag.score_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "rag.score_threshold".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", self.rag.score_threshold),
            });
        }

        if self.rag.search_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.search_limit".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.rag.vector_dim == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.vector_dim".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.ingestion.insert_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ingestion.insert_batch_size".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.database.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_strict() && self.stt.api_key.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "stt.api_key".to_string(),
                message: "STT subscription key must be set outside development".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VAANI prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VAANI")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
