//! API Middleware
//!
//! Request tagging, API key checks and rate limits.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};
use uuid::Uuid;

use super::handlers::AppState;
use super::rate_limit::RouteClass;
use crate::error::GatewayError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PROCESS_TIME_HEADER: &str = "x-process-time";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const RAPIDAPI_KEY_HEADER: &str = "x-rapidapi-key";
pub const RAPIDAPI_SECRET_HEADER: &str = "x-rapidapi-proxy-secret";

/// Paths reachable without an API key.
const PUBLIC_PATHS: &[&str] = &["/", "/health"];

/// Identifier assigned to each request, available to handlers as an
/// `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// == Request Context ==
/// Tags the request with a fresh id, logs start and finish, and stamps
/// `X-Request-ID` and `X-Process-Time` on the response.
pub async fn request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = RequestId::generate();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user = request
        .headers()
        .get("x-rapidapi-user")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();
    let start = Instant::now();

    info!(
        request_id = %request_id.as_str(),
        method = %method,
        path = %path,
        user = %user,
        "Request started"
    );

    request.extensions_mut().insert(request_id.clone());
    let mut response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        request_id = %request_id.as_str(),
        status = response.status().as_u16(),
        "Request completed in {:.2}s", elapsed
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.2}s", elapsed)) {
        headers.insert(PROCESS_TIME_HEADER, value);
    }
    response
}

// == API Key Check ==
/// Rejects requests without an accepted key.
///
/// Requests forwarded by RapidAPI are trusted as already authenticated.
/// An empty allow-list turns the check off.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let allowed = &state.config.allowed_api_keys;
    if allowed.is_empty() || PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let headers = request.headers();
    if header_value(headers, RAPIDAPI_KEY_HEADER).is_some()
        || header_value(headers, RAPIDAPI_SECRET_HEADER).is_some()
    {
        return next.run(request).await;
    }

    let verdict = match header_value(headers, API_KEY_HEADER) {
        None => Err(GatewayError::Unauthorized),
        Some(key) if allowed.iter().any(|k| k == key) => Ok(()),
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected request with unknown API key");
            Err(GatewayError::Forbidden)
        }
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

// == Rate Limit ==
/// Applies the per-client limit of the job route being called.
///
/// Clients are told apart by API key, then forwarded address, then peer
/// address.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limits) = state.rate_limits.as_ref() else {
        return next.run(request).await;
    };

    let prefix = &state.config.api_prefix;
    let path = request.uri().path().to_string();
    let class = match path.strip_prefix(prefix.as_str()) {
        Some("/remove-background") => RouteClass::Single,
        Some("/remove-background/batch") => RouteClass::Batch,
        _ => return next.run(request).await,
    };

    let client = client_key(&request);
    let limiter = limits.limiter(class);
    if limiter.allow(&client) {
        return next.run(request).await;
    }

    warn!(client = %client, path = %path, "Rate limit exceeded");
    GatewayError::RateLimited {
        retry_after: limiter.retry_after_secs(),
    }
    .into_response()
}

fn client_key(request: &Request<Body>) -> String {
    let headers = request.headers();
    if let Some(key) = header_value(headers, API_KEY_HEADER)
        .or_else(|| header_value(headers, RAPIDAPI_KEY_HEADER))
    {
        return format!("key:{}", key);
    }
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return format!("ip:{}", first);
        }
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

/// A header's value, with blank values treated as absent.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
