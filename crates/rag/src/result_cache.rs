//! Search result cache
//!
//! LRU keyed by (namespace, normalized query, limit) with a TTL. Hits skip
//! the embedding API and the vector store entirely. Only successful,
//! non-empty responses are cached; the caller enforces that rule.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::index::SearchResponse;
use vaani_config::constants::cache;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    namespace: String,
    query: String,
    limit: usize,
}

struct CachedEntry {
    response: SearchResponse,
    inserted_at: Instant,
}

/// TTL'd LRU over search responses
pub struct ResultCache {
    inner: Mutex<LruCache<CacheKey, CachedEntry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            cache::RESULT_CACHE_CAPACITY,
            Duration::from_secs(cache::RESULT_CACHE_TTL_SECS),
        )
    }

    pub fn get(&self, namespace: &str, query: &str, limit: usize) -> Option<SearchResponse> {
        let key = CacheKey {
            namespace: namespace.to_string(),
            query: normalize(query),
            limit,
        };

        let mut cache = self.inner.lock();
        match cache.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                metrics::counter!("rag_result_cache_hits").increment(1);
                Some(entry.response.clone())
            }
            Some(_) => {
                cache.pop(&key);
                metrics::counter!("rag_result_cache_misses").increment(1);
                None
            }
            None => {
                metrics::counter!("rag_result_cache_misses").increment(1);
                None
            }
        }
    }

    pub fn put(&self, namespace: &str, query: &str, limit: usize, response: SearchResponse) {
        if response.is_empty() {
            return;
        }
        let key = CacheKey {
            namespace: namespace.to_string(),
            query: normalize(query),
            limit,
        };
        self.inner.lock().put(
            key,
            CachedEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop everything (test hook)
    pub fn reset(&self) {
        self.inner.lock().clear();
    }
}

fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
