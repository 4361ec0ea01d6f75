//! BPE token counting
//!
//! Wraps the cl100k byte-pair encoding so token budgets here agree with the
//! embedding model. Counting the same text repeatedly is the hot path during
//! chunking, so counts go through a bounded LRU.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tiktoken_rs::CoreBPE;

use crate::TextError;
use vaani_config::constants::cache::TOKEN_LRU_CAPACITY;

static SHARED: OnceCell<Arc<Tokenizer>> = OnceCell::new();

/// cl100k tokenizer with a bounded count cache
pub struct Tokenizer {
    bpe: CoreBPE,
    count_cache: Mutex<LruCache<String, usize>>,
}

impl Tokenizer {
    /// Load the cl100k encoding table
    pub fn new() -> Result<Self, TextError> {
        Self::with_cache_capacity(TOKEN_LRU_CAPACITY)
    }

    /// Load with an explicit count-cache capacity
    pub fn with_cache_capacity(capacity: usize) -> Result<Self, TextError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| TextError::TokenizerUnavailable(e.to_string()))?;
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1");
        Ok(Self {
            bpe,
            count_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Process-wide shared instance, loaded lazily on first use
    pub fn shared() -> Result<Arc<Tokenizer>, TextError> {
        if let Some(t) = SHARED.get() {
            return Ok(t.clone());
        }
        let t = Arc::new(Tokenizer::new()?);
        Ok(SHARED.get_or_init(|| t).clone())
    }

    /// Count tokens, consulting the LRU first
    pub fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        {
            let mut cache = self.count_cache.lock();
            if let Some(&count) = cache.get(text) {
                return count;
            }
        }

        let count = self.bpe.encode_ordinary(text).len();

        let mut cache = self.count_cache.lock();
        cache.put(text.to_string(), count);
        count
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    pub fn decode(&self, tokens: &[u32]) -> Result<String, TextError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| TextError::Decode(e.to_string()))
    }

    /// Split `text` so the head holds at most `n` tokens and
    /// `head + rest == text` exactly.
    ///
    /// BPE tokens partition the byte stream, so decoding a token prefix
    /// yields a byte prefix of the input; if the cut lands inside a
    /// multi-byte character we back off one token.
    pub fn split_at_token_boundary<'a>(&self, text: &'a str, n: usize) -> (&'a str, &'a str) {
        if n == 0 {
            return ("", text);
        }

        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= n {
            return (text, "");
        }

        let mut cut = n;
        while cut > 0 {
            if let Ok(head) = self.bpe.decode(tokens[..cut].to_vec()) {
                if text.is_char_boundary(head.len()) && text.starts_with(&head) {
                    return text.split_at(head.len());
                }
            }
            cut -= 1;
        }

        ("", text)
    }

    /// Drop all cached counts (test hook)
    pub fn reset_cache(&self) {
        self.count_cache.lock().clear();
    }
}
