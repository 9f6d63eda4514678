//! Configuration Module
//!
//! Loads gateway configuration from environment variables. Values are
//! parsed and validated once at startup; the resulting `Config` is
//! immutable and shared by every component.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_REPLICATE_MODEL: &str =
    "851-labs/background-remover:a029dff38972b5fda4ec5d75d7d1cd25aeff621d2cf4946a41055d7db66b80bc";
pub const DEFAULT_REPLICATE_API_URL: &str = "https://api.replicate.com";
pub const DEFAULT_IMAGE_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Gateway configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: NonZeroUsize,
    /// Default TTL in seconds for cached results
    pub cache_ttl: i64,
    /// When false every job goes to the processing service
    pub cache_enabled: bool,
    /// Bind host
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Prefix for job submission routes
    pub api_prefix: String,
    /// Largest accepted batch
    pub max_batch_size: NonZeroUsize,
    /// Batch items processed at once
    pub batch_concurrency: NonZeroUsize,
    pub webhook_enabled: bool,
    /// Per-delivery webhook timeout
    pub webhook_timeout: Duration,
    /// Pending notifications before new ones are dropped
    pub notification_queue_size: NonZeroUsize,
    /// Upper bound on one processing call, including polling
    pub processing_timeout: Duration,
    /// Lower-case output formats accepted from clients
    pub allowed_formats: Vec<String>,
    /// Keys accepted in `X-API-Key`; empty disables the check
    pub allowed_api_keys: Vec<String>,
    pub rate_limit_enabled: bool,
    /// Single-job requests allowed per client per window
    pub rate_limit_requests: NonZeroUsize,
    pub rate_limit_window: Duration,
    /// Batch requests allowed per client per window
    pub batch_rate_limit_requests: NonZeroUsize,
    pub batch_rate_limit_window: Duration,
    pub replicate_api_token: String,
    /// `owner/name:version`
    pub replicate_model: String,
    pub replicate_api_url: String,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Cache capacity (default: 1000)
    /// - `CACHE_TTL` - Cache TTL in seconds (default: 3600)
    /// - `CACHE_ENABLED` - Enable the response cache (default: true)
    /// - `SERVER_HOST` / `SERVER_PORT` - Bind address (default: 0.0.0.0:8000)
    /// - `API_PREFIX` - Job route prefix (default: /api/v1)
    /// - `MAX_BATCH_SIZE` - Largest batch (default: 10)
    /// - `BATCH_CONCURRENCY` - Parallel batch items (default: 4)
    /// - `WEBHOOK_ENABLED` / `WEBHOOK_TIMEOUT` - Webhooks (default: true, 30s)
    /// - `NOTIFICATION_QUEUE_SIZE` - Pending webhook bound (default: 256)
    /// - `PROCESSING_TIMEOUT` - Processing call bound in seconds (default: 120)
    /// - `ALLOWED_IMAGE_FORMATS` - Comma list (default: jpg,jpeg,png,webp,gif)
    /// - `ALLOWED_API_KEYS` - Comma list (default: empty)
    /// - `RATE_LIMIT_ENABLED` - Per-client limits on job routes (default: true)
    /// - `RATE_LIMIT_REQUESTS` / `RATE_LIMIT_WINDOW` - Single jobs (default: 100 per 3600s)
    /// - `BATCH_RATE_LIMIT_REQUESTS` / `BATCH_RATE_LIMIT_WINDOW` - Batches (default: 10 per 60s)
    /// - `REPLICATE_API_TOKEN` - Required
    /// - `REPLICATE_MODEL` / `REPLICATE_API_URL` - Processing service
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let replicate_api_token =
            var("REPLICATE_API_TOKEN").ok_or(ConfigError::Missing("REPLICATE_API_TOKEN"))?;

        let allowed_formats: Vec<String> = match var("ALLOWED_IMAGE_FORMATS") {
            Some(raw) => split_list(&raw)
                .into_iter()
                .map(|f| f.to_ascii_lowercase())
                .collect(),
            None => DEFAULT_IMAGE_FORMATS.iter().map(|f| f.to_string()).collect(),
        };
        if allowed_formats.is_empty() {
            return Err(ConfigError::Invalid {
                name: "ALLOWED_IMAGE_FORMATS",
                reason: "at least one format is required".to_string(),
            });
        }

        Ok(Self {
            max_entries: non_zero("MAX_ENTRIES", var("MAX_ENTRIES"), 1000)?,
            cache_ttl: parse("CACHE_TTL", var("CACHE_TTL"), 3600)?,
            cache_enabled: parse_bool("CACHE_ENABLED", var("CACHE_ENABLED"), true)?,
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse("SERVER_PORT", var("SERVER_PORT"), 8000)?,
            api_prefix: normalize_prefix(var("API_PREFIX").as_deref().unwrap_or("/api/v1")),
            max_batch_size: non_zero("MAX_BATCH_SIZE", var("MAX_BATCH_SIZE"), 10)?,
            batch_concurrency: non_zero("BATCH_CONCURRENCY", var("BATCH_CONCURRENCY"), 4)?,
            webhook_enabled: parse_bool("WEBHOOK_ENABLED", var("WEBHOOK_ENABLED"), true)?,
            webhook_timeout: seconds("WEBHOOK_TIMEOUT", var("WEBHOOK_TIMEOUT"), 30)?,
            notification_queue_size: non_zero(
                "NOTIFICATION_QUEUE_SIZE",
                var("NOTIFICATION_QUEUE_SIZE"),
                256,
            )?,
            processing_timeout: seconds("PROCESSING_TIMEOUT", var("PROCESSING_TIMEOUT"), 120)?,
            allowed_formats,
            allowed_api_keys: var("ALLOWED_API_KEYS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            rate_limit_enabled: parse_bool("RATE_LIMIT_ENABLED", var("RATE_LIMIT_ENABLED"), true)?,
            rate_limit_requests: non_zero(
                "RATE_LIMIT_REQUESTS",
                var("RATE_LIMIT_REQUESTS"),
                100,
            )?,
            rate_limit_window: seconds("RATE_LIMIT_WINDOW", var("RATE_LIMIT_WINDOW"), 3600)?,
            batch_rate_limit_requests: non_zero(
                "BATCH_RATE_LIMIT_REQUESTS",
                var("BATCH_RATE_LIMIT_REQUESTS"),
                10,
            )?,
            batch_rate_limit_window: seconds(
                "BATCH_RATE_LIMIT_WINDOW",
                var("BATCH_RATE_LIMIT_WINDOW"),
                60,
            )?,
            replicate_api_token,
            replicate_model: var("REPLICATE_MODEL")
                .unwrap_or_else(|| DEFAULT_REPLICATE_MODEL.to_string()),
            replicate_api_url: var("REPLICATE_API_URL")
                .unwrap_or_else(|| DEFAULT_REPLICATE_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// == Parsing Helpers ==

fn parse<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("'{}': {}", raw, e),
        }),
    }
}

fn non_zero(
    name: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<NonZeroUsize, ConfigError> {
    let value: usize = parse(name, raw, default)?;
    NonZeroUsize::new(value).ok_or(ConfigError::Invalid {
        name,
        reason: "must be greater than zero".to_string(),
    })
}

fn seconds(name: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parse(name, raw, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
