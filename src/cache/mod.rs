//! Cache Module
//!
//! In-memory response cache with TTL expiration and LRU eviction, plus the
//! key derivation that maps image jobs onto cache entries.

mod entry;
mod key;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{derive_key, CacheKey, CACHE_KEY_LEN};
pub use lru::LruTracker;
pub use shared::SharedCache;
pub use stats::{CacheCounters, CacheStats};
pub use store::CacheStore;
