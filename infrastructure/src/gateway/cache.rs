//! Bounded LRU response cache

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stepwise_domain::{CacheKey, LlmResponse};

/// Counters reported by [`ResponseCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Response cache keyed by normalized request fingerprints.
///
/// One instance is shared by every gateway of a process. Concurrent misses
/// on the same key may both reach the backend; the last insert wins.
pub struct ResponseCache {
    capacity: usize,
    entries: Cache<CacheKey, LlmResponse>,
    counters: Arc<Counters>,
}

impl ResponseCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let counters = Arc::new(Counters::default());
        let evicted = Arc::clone(&counters);
        let entries = Cache::<CacheKey, LlmResponse>::builder()
            .max_capacity(capacity as u64)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Size {
                    evicted.evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self {
            capacity,
            entries,
            counters,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<LlmResponse> {
        let found = self.entries.get(key);
        let counter = match found {
            Some(_) => &self.counters.hits,
            None => &self.counters.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert or replace, evicting the least recently used entry when full.
    pub fn insert(&self, key: CacheKey, response: LlmResponse) {
        self.entries.insert(key, response);
        // Apply pending reads and evictions now so capacity and counters
        // are exact once insert returns.
        self.entries.run_pending_tasks();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            len: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }
}
