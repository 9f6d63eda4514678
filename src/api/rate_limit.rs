//! Per-client sliding-window rate limits for the job routes.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::Config;

/// Sliding-window limiter keyed by client.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: NonZeroUsize) -> Self {
        Self {
            window,
            max_requests: max_requests.get(),
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Records a request from `client` and reports whether it is allowed.
    /// Rejected requests do not use up the window.
    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    fn allow_at(&self, client: &str, now: Instant) -> bool {
        let window = self.window;
        let mut entry = self.buckets.entry(client.to_string()).or_default();
        entry.retain(|instant| now.saturating_duration_since(*instant) < window);

        if entry.len() >= self.max_requests {
            return false;
        }
        entry.push(now);
        true
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

/// Which limit a request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Single,
    Batch,
}

/// Limits for the two job routes. Other routes are never limited.
#[derive(Debug, Clone)]
pub struct RateLimits {
    single: RateLimiter,
    batch: RateLimiter,
}

impl RateLimits {
    /// Returns `None` when rate limiting is switched off.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.rate_limit_enabled {
            return None;
        }
        Some(Self {
            single: RateLimiter::new(config.rate_limit_window, config.rate_limit_requests),
            batch: RateLimiter::new(
                config.batch_rate_limit_window,
                config.batch_rate_limit_requests,
            ),
        })
    }

    pub fn limiter(&self, class: RouteClass) -> &RateLimiter {
        match class {
            RouteClass::Single => &self.single,
            RouteClass::Batch => &self.batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: usize, window_secs: u64) -> RateLimiter {
        RateLimiter::new(
            Duration::from_secs(window_secs),
            NonZeroUsize::new(max).unwrap(),
        )
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter(2, 60);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1, 10);
        let start = Instant::now();

        assert!(limiter.allow_at("a", start));
        assert!(!limiter.allow_at("a", start + Duration::from_secs(9)));
        assert!(limiter.allow_at("a", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        assert_eq!(limiter(1, 60).retry_after_secs(), 60);
        let sub_second = RateLimiter::new(Duration::from_millis(10), NonZeroUsize::new(1).unwrap());
        assert_eq!(sub_second.retry_after_secs(), 1);
    }

    #[test]
    fn test_disabled_by_config() {
        let config = Config::from_lookup(|name| match name {
            "REPLICATE_API_TOKEN" => Some("t".to_string()),
            "RATE_LIMIT_ENABLED" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(RateLimits::from_config(&config).is_none());
    }
}
