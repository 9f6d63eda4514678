//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use super::middleware::RequestId;
use super::rate_limit::RateLimits;
use crate::cache::SharedCache;
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::models::{
    BatchRequest, BatchResponse, CacheStatsResponse, HealthResponse, JobOutcome,
    MessageResponse, RemoveBackgroundRequest, ServiceInfo,
};
use crate::orchestrator::Orchestrator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<Config>,
    /// `None` when rate limiting is off
    pub rate_limits: Option<RateLimits>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: Config) -> Self {
        Self {
            rate_limits: RateLimits::from_config(&config),
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        self.orchestrator.cache()
    }
}

/// Handler for GET /
pub async fn root_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo::new(&state.config.api_prefix))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.cache().stats().await;
    Json(HealthResponse::healthy(
        state.started_at.elapsed().as_secs(),
        stats,
        !state.config.replicate_api_token.is_empty(),
    ))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        cache: state.cache().stats().await,
        enabled: state.config.cache_enabled,
    })
}

/// Handler for DELETE /cache
///
/// Drops every entry. Hit/miss/eviction counters keep counting.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache().clear().await;
    Json(MessageResponse::new("Cache cleared successfully"))
}

/// Handler for POST {prefix}/remove-background
///
/// The job runs on its own task so a client disconnect does not abort a
/// processing call that is already under way.
pub async fn remove_background_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: std::result::Result<Json<RemoveBackgroundRequest>, JsonRejection>,
) -> Result<Json<JobOutcome>> {
    let Json(req) = body?;
    let orchestrator = Arc::clone(&state.orchestrator);
    let outcome = detach(async move { orchestrator.process(req, request_id.0).await }).await?;
    Ok(Json(outcome))
}

/// Handler for POST {prefix}/remove-background/batch
pub async fn batch_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>> {
    let Json(req) = body?;
    let orchestrator = Arc::clone(&state.orchestrator);
    let response = detach(async move {
        orchestrator
            .process_batch(req.into_jobs(), request_id.0)
            .await
    })
    .await?;
    Ok(Json(response))
}

/// Runs `job` on a separate task and waits for it.
async fn detach<T, F>(job: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(job)
        .await
        .map_err(|e| GatewayError::Internal(format!("job task failed: {}", e)))?
}
