//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and lazy
//! TTL expiration. Expired entries are reclaimed only when their key is read
//! again or when they reach the LRU end under capacity pressure.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use tracing::debug;

use crate::cache::{CacheCounters, CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Bounded key-value storage with LRU eviction and TTL support.
///
/// Every operation is total: lookups that find nothing return `None`,
/// deletes of unknown keys are no-ops.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Lifetime counters
    counters: CacheCounters,
    /// Maximum number of entries allowed
    capacity: NonZeroUsize,
    /// TTL in seconds applied when `set` is called without one
    default_ttl: i64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and default TTL.
    pub fn new(capacity: NonZeroUsize, default_ttl: i64) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.get().min(1024)),
            lru: LruTracker::new(),
            counters: CacheCounters::default(),
            capacity,
            default_ttl,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit moves the key to the most-recently-used position. Expired
    /// entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let Some(entry) = self.entries.get(key) else {
            self.counters.record_miss();
            debug!(key, "cache miss");
            return None;
        };

        if entry.is_expired() {
            self.entries.remove(key);
            self.lru.remove(key);
            self.counters.record_miss();
            debug!(key, "cache entry expired");
            return None;
        }

        let value = entry.value.clone();
        self.lru.touch(key);
        self.counters.record_hit();
        debug!(key, "cache hit");
        Some(value)
    }

    // == Set ==
    /// Stores a value under `key`, overwriting any previous entry.
    ///
    /// `ttl` is in seconds and falls back to the store's default. When the
    /// store is full and `key` is new, the least recently used entry is
    /// evicted first, so the size never exceeds capacity.
    pub fn set(&mut self, key: String, value: String, ttl: Option<i64>) {
        let ttl = ttl.unwrap_or(self.default_ttl);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity.get() {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.counters.record_eviction();
                debug!(key = %evicted, "cache full, evicted least recently used entry");
            }
        }

        debug!(key = %key, ttl, "cache set");
        self.lru.touch(&key);
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            debug!(key, "cache delete");
        }
        removed
    }

    // == Clear ==
    /// Removes every entry. Hit/miss/eviction counters are kept.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        debug!(dropped, "cache cleared");
    }

    // == Stats ==
    /// Returns a snapshot of occupancy and lifetime counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats::snapshot(&self.counters, self.entries.len(), self.capacity.get())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    #[cfg(test)]
    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }
}
