//! Shared Cache Handle
//!
//! Cloneable handle that serializes access to one [`CacheStore`] across
//! concurrent request tasks.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheKey, CacheStats, CacheStore};

/// Thread-safe handle to the process-wide cache store.
///
/// Lookups take the write lock because they update recency and counters;
/// only `stats` reads under the shared lock. Guards are released before
/// each method returns.
#[derive(Debug, Clone)]
pub struct SharedCache {
    inner: Arc<RwLock<CacheStore>>,
}

impl SharedCache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Builds a fresh store and wraps it.
    pub fn with_capacity(capacity: NonZeroUsize, default_ttl: i64) -> Self {
        Self::new(CacheStore::new(capacity, default_ttl))
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.inner.write().await.get(key.as_str())
    }

    pub async fn set(&self, key: &CacheKey, value: String, ttl: Option<i64>) {
        self.inner
            .write()
            .await
            .set(key.as_str().to_string(), value, ttl);
    }

    pub async fn delete(&self, key: &CacheKey) -> bool {
        self.inner.write().await.delete(key.as_str())
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }
}
