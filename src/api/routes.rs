//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_handler, cache_stats_handler, clear_cache_handler, health_handler,
    remove_background_handler, root_handler, AppState,
};
use super::middleware::{rate_limit, request_context, require_api_key};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /` - Service info
/// - `GET /health` - Health check with cache statistics
/// - `GET /cache/stats` - Cache statistics
/// - `DELETE /cache` - Clear the cache
/// - `POST {prefix}/remove-background` - Single job
/// - `POST {prefix}/remove-background/batch` - Batch of jobs
///
/// # Middleware
/// - Request context: request id and timing headers
/// - Rate limits on the two job routes
/// - API key check (skipped for `/` and `/health`)
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let prefix = state.config.api_prefix.clone();

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route(
            &format!("{}/remove-background", prefix),
            post(remove_background_handler),
        )
        .route(
            &format!("{}/remove-background/batch", prefix),
            post(batch_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(middleware::from_fn(request_context))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SharedCache;
    use crate::config::Config;
    use crate::models::ImageJob;
    use crate::orchestrator::{Orchestrator, OrchestratorSettings};
    use crate::processor::{ImageProcessor, ProcessorError};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    struct EchoProcessor;

    #[async_trait]
    impl ImageProcessor for EchoProcessor {
        async fn invoke(&self, job: &ImageJob) -> Result<String, ProcessorError> {
            Ok(format!("{}.out", job.image_url))
        }
    }

    fn create_test_app(api_keys: Option<&str>) -> Router {
        create_test_app_with(api_keys, None)
    }

    fn create_test_app_with(api_keys: Option<&str>, single_limit: Option<&str>) -> Router {
        let keys = api_keys.map(str::to_string);
        let limit = single_limit.map(str::to_string);
        let config = Config::from_lookup(move |name| match name {
            "REPLICATE_API_TOKEN" => Some("r8_test".to_string()),
            "ALLOWED_API_KEYS" => keys.clone(),
            "RATE_LIMIT_REQUESTS" => limit.clone(),
            _ => None,
        })
        .unwrap();
        let cache = SharedCache::with_capacity(config.max_entries, config.cache_ttl);
        let orchestrator = Orchestrator::new(
            cache,
            Arc::new(EchoProcessor),
            None,
            OrchestratorSettings::from_config(&config),
        );
        create_router(AppState::new(orchestrator, config))
    }

    fn job_request(api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/remove-background")
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        builder
            .body(Body::from(r#"{"image_url":"https://img.example/a.jpg"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app(Some("secret"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-process-time"));
    }

    #[tokio::test]
    async fn test_job_endpoint_open_without_keys() {
        let app = create_test_app(None);

        let response = app.oneshot(job_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unauthorized() {
        let app = create_test_app(Some("secret"));

        let response = app.oneshot(job_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_forbidden() {
        let app = create_test_app(Some("secret,other"));

        let response = app.oneshot(job_request(Some("guess"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_valid_api_key_passes() {
        let app = create_test_app(Some("secret,other"));

        let response = app.oneshot(job_request(Some("other"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rapidapi_header_passes() {
        let app = create_test_app(Some("secret"));
        let request = Request::builder()
            .uri("/cache/stats")
            .header("x-rapidapi-proxy-secret", "anything")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_not_found() {
        let app = create_test_app(None);

        let response = app
            .oneshot(Request::builder().uri("/get/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_api_key_is_unauthorized() {
        let app = create_test_app(Some("secret"));

        let response = app.oneshot(job_request(Some(""))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_blank_rapidapi_key_does_not_pass() {
        let app = create_test_app(Some("secret"));
        let request = Request::builder()
            .uri("/cache/stats")
            .header("x-rapidapi-key", "  ")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_single_job_rate_limited() {
        let app = create_test_app_with(None, Some("1"));

        let first = app.clone().oneshot(job_request(None)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(job_request(None)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["retry-after"], "3600");
        assert!(second.headers().contains_key("x-request-id"));

        let health = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }
}
