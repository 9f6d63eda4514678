//! Notification Module
//!
//! Best-effort webhook delivery of job outcomes. The request path only
//! enqueues; a background worker performs the POST with its own timeout,
//! logs failures, and never retries.

mod dispatcher;
mod webhook;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use dispatcher::{Notification, NotificationDispatcher};
pub use webhook::WebhookSink;

/// Body POSTed to a job's webhook URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub request_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 time the outcome was produced
    pub timestamp: String,
    /// Seconds spent on the job
    pub processing_time: f64,
}

impl WebhookPayload {
    pub fn success(request_id: String, output_url: String, processing_time: f64) -> Self {
        Self {
            request_id,
            success: true,
            output_url: Some(output_url),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            processing_time,
        }
    }

    pub fn failure(request_id: String, error: String, processing_time: f64) -> Self {
        Self {
            request_id,
            success: false,
            output_url: None,
            error: Some(error),
            timestamp: chrono::Utc::now().to_rfc3339(),
            processing_time,
        }
    }
}

/// Why a notification did not reach its endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    #[error("webhook timed out")]
    Timeout,

    #[error("webhook transport error: {0}")]
    Transport(String),

    #[error("webhook returned status {0}")]
    Status(u16),

    #[error("notification queue is full")]
    QueueFull,

    #[error("notification worker has stopped")]
    Closed,
}

/// Destination for job outcome notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, endpoint: &str, payload: &WebhookPayload)
        -> Result<(), NotificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_payload_serialize() {
        let payload = WebhookPayload::success("req-1".into(), "https://out/a.png".into(), 2.5);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["request_id"], "req-1");
        assert_eq!(json["success"], true);
        assert_eq!(json["output_url"], "https://out/a.png");
        assert!(json.get("error").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_failure_payload_serialize() {
        let payload = WebhookPayload::failure("req-2".into(), "service down".into(), 0.3);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "service down");
        assert!(json.get("output_url").is_none());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(NotificationError::Status(502).to_string(), "webhook returned status 502");
        assert_eq!(NotificationError::Timeout.to_string(), "webhook timed out");
    }
}
