//! Error types for the gateway
//!
//! Provides unified error handling using thiserror.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::processor::ProcessorError;

// == Gateway Error Enum ==
/// Errors surfaced to callers of the orchestrator and the HTTP API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Malformed or disallowed job parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The processing service failed or timed out; callers may retry
    #[error("Background removal service error: {0}")]
    ServiceUnavailable(String),

    /// No API key supplied while keys are enforced
    #[error("API key required. Provide X-API-Key header or use RapidAPI.")]
    Unauthorized,

    /// API key supplied but not recognised
    #[error("Invalid API key")]
    Forbidden,

    /// Too many requests from one client inside the current window
    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// Anything the processing service reported that fits no other class
    #[error("An unexpected error occurred: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProcessorError> for GatewayError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::ServiceUnavailable(msg) => GatewayError::ServiceUnavailable(msg),
            ProcessorError::InvalidInput(msg) => GatewayError::InvalidInput(msg),
            ProcessorError::Unknown(msg) => GatewayError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidInput(rejection.body_text())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        let mut response = (self.status_code(), body).into_response();
        if let GatewayError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// == Config Error Enum ==
/// Startup configuration problems. Fatal; never raised once serving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// == Result Type Alias ==
/// Convenience Result type for the gateway.
pub type Result<T> = std::result::Result<T, GatewayError>;
