//! Cache Statistics Module
//!
//! Lifetime hit/miss/eviction counters and the snapshot reported to callers.

use serde::Serialize;

// == Cache Counters ==
/// Monotonic counters owned by the store. Never reset, not even by `clear`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheCounters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    // == Hit Rate ==
    /// Hit rate as a percentage in `[0, 100]`; `0.0` before any lookup.
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache, as served by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Formatted percentage, e.g. `"75.00%"`
    pub hit_rate: String,
    /// `hits + misses`
    pub total_requests: u64,
}

impl CacheStats {
    /// Builds a snapshot from the store's counters and occupancy.
    pub fn snapshot(counters: &CacheCounters, size: usize, capacity: usize) -> Self {
        Self {
            size,
            capacity,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            hit_rate: format!("{:.2}%", counters.hit_rate_percent()),
            total_requests: counters.total_requests(),
        }
    }
}
