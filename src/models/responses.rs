//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cache::CacheStats;

/// One entry of a batch response. Failed items carry `error` instead of
/// `output_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub input_url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(input_url: String, output_url: String, cached: bool) -> Self {
        Self {
            input_url,
            success: true,
            output_url: Some(output_url),
            cached: Some(cached),
            error: None,
        }
    }

    pub fn failed(input_url: String, error: impl Into<String>) -> Self {
        Self {
            input_url,
            success: false,
            output_url: None,
            cached: None,
            error: Some(error.into()),
        }
    }
}

/// Response body for the batch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Seconds spent on the whole batch
    pub processing_time: f64,
    /// Per-item results in input order
    pub results: Vec<BatchItemResult>,
}

impl BatchResponse {
    pub fn new(results: Vec<BatchItemResult>, processing_time: f64) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            processing_time,
            results,
        }
    }
}

/// Response body for `GET /cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub cache: CacheStats,
    pub enabled: bool,
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    pub version: String,
    /// Time since startup, e.g. `"3h 12m"`
    pub uptime: String,
    pub cache_stats: CacheStats,
    /// Whether a processing-service token is configured
    pub api_configured: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(uptime_secs: u64, cache_stats: CacheStats, api_configured: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime: format_uptime(uptime_secs),
            cache_stats,
            api_configured,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn format_uptime(secs: u64) -> String {
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

/// Response body for `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub api_prefix: String,
    pub endpoints: BTreeMap<&'static str, String>,
}

impl ServiceInfo {
    pub fn new(api_prefix: &str) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("health", "/health".to_string());
        endpoints.insert("cache_stats", "/cache/stats".to_string());
        endpoints.insert("remove_background", format!("{}/remove-background", api_prefix));
        endpoints.insert(
            "batch_processing",
            format!("{}/remove-background/batch", api_prefix),
        );

        Self {
            name: "Background Removal API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "online".to_string(),
            api_prefix: api_prefix.to_string(),
            endpoints,
        }
    }
}
