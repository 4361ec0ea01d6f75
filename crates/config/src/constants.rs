//! Centralized constants for the voice agent runtime
//!
//! Single source of truth for operational parameters used across crates.
//! Tenant-specific values (prompts, voices, tool wiring) live in the
//! database, never here.

/// Service endpoints (loaded from env vars with fallback defaults)
pub mod endpoints {
    use once_cell::sync::Lazy;

    /// Database RPC surface (env: VAANI_DB_URL)
    pub static DB_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("VAANI_DB_URL").unwrap_or_else(|_| "http://127.0.0.1:3210".to_string())
    });

    /// Embedding API endpoint (env: EMBEDDING_URL)
    pub static EMBEDDING_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("EMBEDDING_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
    });

    /// Qdrant vector store endpoint (env: QDRANT_URL)
    pub static QDRANT_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
    });

    /// Document parser service (env: PARSER_URL)
    pub static PARSER_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("PARSER_URL").unwrap_or_else(|_| "http://127.0.0.1:8500".to_string())
    });

    /// Streaming STT WebSocket endpoint (env: STT_WS_URL)
    pub static STT_WS_DEFAULT: Lazy<String> = Lazy::new(|| {
        std::env::var("STT_WS_URL")
            .unwrap_or_else(|_| "wss://api.sarvam.ai/speech-to-text/ws".to_string())
    });
}

/// Timeouts and delays (milliseconds unless noted)
pub mod timeouts {
    /// Outbound integration HTTP timeout (ms)
    pub const PLUGIN_HTTP_MS: u64 = 15_000;

    /// STT WebSocket connect timeout (ms)
    pub const STT_CONNECT_MS: u64 = 10_000;

    /// Maximum lifetime of one pooled STT connection (seconds)
    pub const STT_MAX_SESSION_SECS: u64 = 300;

    /// Delay between STT reconnect attempts (ms)
    pub const STT_RECONNECT_DELAY_MS: u64 = 1_000;

    /// Maximum STT reconnect attempts before the stream fails
    pub const STT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

    /// Pause while the socket is down before re-checking (ms)
    pub const STT_BACKPRESSURE_SLEEP_MS: u64 = 100;

    /// Grace period before end_call tears the session down (ms), so the
    /// farewell audio can finish playing
    pub const END_CALL_GRACE_MS: u64 = 3_000;

    /// Remote document parser request timeout (ms)
    pub const PARSER_REQUEST_MS: u64 = 30_000;

    /// Embedding API request timeout (ms)
    pub const EMBEDDING_REQUEST_MS: u64 = 10_000;
}

/// STT audio framing
pub mod stt {
    /// Emitted audio chunk duration (ms)
    pub const CHUNK_DURATION_MS: u32 = 100;
}

/// Cache sizing and TTLs
pub mod cache {
    /// Distinct inputs kept by the token-count cache
    pub const TOKEN_LRU_CAPACITY: usize = 10_000;

    /// RAG result cache capacity
    pub const RESULT_CACHE_CAPACITY: usize = 512;

    /// RAG result cache TTL (seconds)
    pub const RESULT_CACHE_TTL_SECS: u64 = 300;

    /// Agent-config cache TTL (seconds)
    pub const AGENT_CONFIG_TTL_SECS: u64 = 60;

    /// Agent-config cache capacity
    pub const AGENT_CONFIG_CAPACITY: usize = 256;

    /// Full-prompt cache TTL (seconds)
    pub const PROMPT_CACHE_TTL_SECS: u64 = 600;

    /// Full-prompt cache capacity
    pub const PROMPT_CACHE_CAPACITY: usize = 256;

    /// Per-organization business-info cache TTL (seconds)
    pub const ORG_INFO_TTL_SECS: u64 = 600;
}

/// Chunking defaults (token counts)
pub mod chunking {
    /// Standard-density preset
    pub const STANDARD_TARGET_TOKENS: usize = 384;
    pub const STANDARD_MIN_TOKENS: usize = 192;
    pub const STANDARD_MAX_TOKENS: usize = 512;
    pub const STANDARD_OVERLAP_TOKENS: usize = 64;

    /// Context prefix budget per chunk
    pub const CONTEXT_PREFIX_MAX_TOKENS: usize = 32;

    /// Overlap is skipped when the next chunk already starts this similar
    pub const OVERLAP_JACCARD_SKIP: f32 = 0.7;
}

/// RAG search defaults
pub mod rag {
    /// Default similarity threshold for knowledge search
    pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.35;

    /// Threshold reduction for location/hours/contact intents (recall boost)
    pub const INTENT_THRESHOLD_DELTA: f32 = 0.05;

    /// Default result count
    pub const DEFAULT_LIMIT: usize = 5;

    /// Search slower than this is tagged cold in logs (ms)
    pub const COLD_SEARCH_MS: u64 = 1_000;

    /// Probe rounds attempted by clear_namespace without enumeration
    pub const CLEAR_PROBE_ROUNDS: usize = 8;
}

/// Ingestion pipeline
pub mod ingest {
    /// Concurrent vector-store inserts per document
    pub const INSERT_BATCH_SIZE: usize = 8;

    /// Remote parser retry attempts
    pub const PARSER_MAX_RETRIES: u32 = 3;

    /// Parser retry backoff base (ms)
    pub const PARSER_BACKOFF_BASE_MS: u64 = 1_000;

    /// Parser retry backoff cap (ms)
    pub const PARSER_BACKOFF_CAP_MS: u64 = 10_000;

    /// Chars of chunk text persisted in metadata for debugging
    pub const CHUNK_PREVIEW_CHARS: usize = 200;
}
