//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A cached result locator together with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value (a result URL)
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl_seconds` from now.
    ///
    /// A zero or negative TTL produces an entry that is already expired.
    pub fn new(value: String, ttl_seconds: i64) -> Self {
        Self::created_at(value, current_timestamp_ms(), ttl_seconds)
    }

    /// Creates an entry as if written at `now_ms`. Expiry saturates at both
    /// ends of the clock.
    pub fn created_at(value: String, now_ms: u64, ttl_seconds: i64) -> Self {
        Self {
            value,
            expires_at: now_ms.saturating_add_signed(ttl_seconds.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time,
    /// so a zero TTL is never served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
///
/// A clock set before the epoch reads as `0`.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new("https://cdn.example/out.png".to_string(), 60);

        assert_eq!(entry.value, "https://cdn.example/out.png");
        assert!(!entry.is_expired());

        let fixed = CacheEntry::created_at("v".to_string(), 5_000, 60);
        assert_eq!(fixed.expires_at, 65_000);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("value".to_string(), 1);

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new("value".to_string(), 0);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_negative_ttl_is_expired_immediately() {
        let entry = CacheEntry::new("value".to_string(), -30);
        assert!(entry.is_expired());

        let fixed = CacheEntry::created_at("value".to_string(), 100_000, -30);
        assert_eq!(fixed.expires_at, 70_000);

        let early = CacheEntry::created_at("value".to_string(), 10, -30);
        assert_eq!(early.expires_at, 0);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let entry = CacheEntry::created_at("value".to_string(), 1_000, i64::MAX);
        assert_eq!(entry.expires_at, 1_000 + i64::MAX as u64);

        let live = CacheEntry::new("value".to_string(), i64::MAX);
        assert!(!live.is_expired());
    }

    #[test]
    fn test_huge_ttl_saturates_at_clock_end() {
        let entry = CacheEntry::created_at("value".to_string(), u64::MAX - 5, i64::MAX);
        assert_eq!(entry.expires_at, u64::MAX);
        assert!(!entry.is_expired_at(u64::MAX - 1));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::created_at("test".to_string(), 1_000, 1);

        assert!(!entry.is_expired_at(1_999));
        assert!(entry.is_expired_at(2_000), "Entry should be expired at boundary");
        assert!(entry.is_expired_at(2_001));
    }
}
