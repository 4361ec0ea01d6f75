//! Text processing for knowledge ingestion
//!
//! Features:
//! - cl100k BPE token counting with a bounded LRU cache
//! - Recursive token-bounded splitting with density presets and overlap
//! - Protected regions (code fences, pipe tables, Q/A pairs) kept whole
//! - Language-agnostic content hashing for chunk dedup

pub mod dedup;
pub mod splitter;
pub mod tokenizer;

pub use dedup::{chunk_key, content_hash, find_stale_keys, normalize_for_hash};
pub use splitter::{ContentDensity, RecursiveSplitter, SplitChunk, SplitterConfig};
pub use tokenizer::Tokenizer;

use thiserror::Error;

/// Text processing errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    #[error("Token decode error: {0}")]
    Decode(String),
}

impl From<TextError> for vaani_core::Error {
    fn from(err: TextError) -> Self {
        match err {
            TextError::TokenizerUnavailable(msg) => vaani_core::Error::TokenizerUnavailable(msg),
            TextError::Decode(msg) => vaani_core::Error::Internal(msg),
        }
    }
}
