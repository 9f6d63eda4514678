//! Client for a hosted prediction API (Replicate-compatible).
//!
//! A job becomes one prediction. The create call asks the service to hold
//! the connection until the prediction finishes; if it comes back still
//! running, the prediction is polled until it reaches a terminal state or
//! the processing timeout runs out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::{ImageProcessor, ProcessorError};
use crate::config::Config;
use crate::models::ImageJob;

const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Where predictions are created for the configured model.
#[derive(Debug, Clone, PartialEq)]
enum ModelRef {
    /// `owner/name:version` -> `POST /v1/predictions` with a version id
    Version(String),
    /// `owner/name` -> `POST /v1/models/owner/name/predictions`
    Official(String),
}

impl ModelRef {
    fn parse(model: &str) -> Self {
        match model.split_once(':') {
            Some((_, version)) if !version.is_empty() => ModelRef::Version(version.to_string()),
            _ => ModelRef::Official(model.trim_end_matches(':').to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

/// [`ImageProcessor`] backed by the prediction HTTP API.
#[derive(Debug, Clone)]
pub struct ReplicateProcessor {
    client: Client,
    base_url: String,
    token: String,
    model: ModelRef,
    processing_timeout: Duration,
    poll_interval: Duration,
}

impl ReplicateProcessor {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        model: &str,
        processing_timeout: Duration,
    ) -> Result<Self, ProcessorError> {
        let client = Client::builder()
            .timeout(processing_timeout)
            .build()
            .map_err(|e| ProcessorError::Unknown(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            model: ModelRef::parse(model),
            processing_timeout,
            poll_interval: POLL_INTERVAL,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ProcessorError> {
        Self::new(
            config.replicate_api_url.clone(),
            config.replicate_api_token.clone(),
            &config.replicate_model,
            config.processing_timeout,
        )
    }

    /// Overrides the delay between status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn create_request(&self, job: &ImageJob) -> (String, Value) {
        let input = json!({
            "image": job.image_url,
            "format": job.format,
            "reverse": job.reverse,
            "threshold": job.threshold,
            "background_type": job.background_type,
        });

        match &self.model {
            ModelRef::Version(version) => (
                format!("{}/v1/predictions", self.base_url),
                json!({ "version": version, "input": input }),
            ),
            ModelRef::Official(name) => (
                format!("{}/v1/models/{}/predictions", self.base_url, name),
                json!({ "input": input }),
            ),
        }
    }

    async fn run(&self, job: &ImageJob) -> Result<String, ProcessorError> {
        let (url, body) = self.create_request(job);
        debug!(url = %url, image = %job.image_url, "creating prediction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Prefer", "wait")
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let mut prediction = read_prediction(response).await?;
        info!(prediction = %prediction.id, status = %prediction.status, "prediction created");

        while !prediction.is_terminal() {
            let poll_url = prediction.urls.get.clone().ok_or_else(|| {
                ProcessorError::Unknown(format!(
                    "prediction {} is {} but has no status URL",
                    prediction.id, prediction.status
                ))
            })?;

            sleep(self.poll_interval).await;

            let response = self
                .client
                .get(&poll_url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(transport_error)?;
            prediction = read_prediction(response).await?;
            debug!(prediction = %prediction.id, status = %prediction.status, "polled prediction");
        }

        match prediction.status.as_str() {
            "succeeded" => extract_output(&prediction.output).ok_or_else(|| {
                ProcessorError::Unknown(format!(
                    "prediction {} succeeded without an output URL",
                    prediction.id
                ))
            }),
            status => {
                let reason = prediction
                    .error
                    .as_ref()
                    .map(error_text)
                    .unwrap_or_else(|| format!("prediction {}", status));
                Err(ProcessorError::ServiceUnavailable(reason))
            }
        }
    }
}

#[async_trait]
impl ImageProcessor for ReplicateProcessor {
    async fn invoke(&self, job: &ImageJob) -> Result<String, ProcessorError> {
        let started = Instant::now();
        match timeout(self.processing_timeout, self.run(job)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    image = %job.image_url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "processing timed out"
                );
                Err(ProcessorError::ServiceUnavailable(format!(
                    "processing timed out after {}s",
                    self.processing_timeout.as_secs()
                )))
            }
        }
    }
}

// == Response Helpers ==

async fn read_prediction(response: reqwest::Response) -> Result<Prediction, ProcessorError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let detail = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("detail").map(error_text))
            .unwrap_or(text);
        return Err(classify_status(status, detail));
    }

    serde_json::from_str(&text)
        .map_err(|e| ProcessorError::Unknown(format!("malformed prediction response: {}", e)))
}

fn classify_status(status: StatusCode, detail: String) -> ProcessorError {
    let message = format!("{} ({})", detail, status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProcessorError::ServiceUnavailable(message)
    } else if status.is_client_error() {
        ProcessorError::InvalidInput(message)
    } else {
        ProcessorError::Unknown(message)
    }
}

fn transport_error(err: reqwest::Error) -> ProcessorError {
    if err.is_timeout() {
        ProcessorError::ServiceUnavailable("processing service timed out".to_string())
    } else {
        ProcessorError::ServiceUnavailable(format!("processing service unreachable: {}", err))
    }
}

/// The output is either a URL or a list whose first element is the URL.
fn extract_output(output: &Value) -> Option<String> {
    match output {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::StatusCode as AxumStatus,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_model_ref_parse() {
        assert_eq!(
            ModelRef::parse("851-labs/background-remover:abc123"),
            ModelRef::Version("abc123".to_string())
        );
        assert_eq!(
            ModelRef::parse("851-labs/background-remover"),
            ModelRef::Official("851-labs/background-remover".to_string())
        );
    }

    #[test]
    fn test_extract_output() {
        assert_eq!(
            extract_output(&json!("https://out/a.png")).as_deref(),
            Some("https://out/a.png")
        );
        assert_eq!(
            extract_output(&json!(["https://out/b.png", "x"])).as_deref(),
            Some("https://out/b.png")
        );
        assert_eq!(extract_output(&Value::Null), None);
        assert_eq!(extract_output(&json!([])), None);
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "bad".into()),
            ProcessorError::InvalidInput(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ProcessorError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "down".into()),
            ProcessorError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn test_create_request_uses_version() {
        let processor = ReplicateProcessor::new(
            "http://localhost/",
            "t",
            "owner/model:v1",
            Duration::from_secs(5),
        )
        .unwrap();
        let (url, body) = processor.create_request(&ImageJob::for_url("https://img/a.jpg"));

        assert_eq!(url, "http://localhost/v1/predictions");
        assert_eq!(body["version"], "v1");
        assert_eq!(body["input"]["image"], "https://img/a.jpg");
        assert_eq!(body["input"]["background_type"], "rgba");
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn processor(base: &str) -> ReplicateProcessor {
        ReplicateProcessor::new(base, "test-token", "owner/model:v1", Duration::from_secs(5))
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_invoke_immediate_success() {
        let app = Router::new().route(
            "/v1/predictions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["input"]["format"], "png");
                Json(json!({
                    "id": "p1",
                    "status": "succeeded",
                    "output": "https://out/p1.png",
                }))
            }),
        );
        let base = serve(app).await;

        let url = processor(&base)
            .invoke(&ImageJob::for_url("https://img/a.jpg"))
            .await
            .unwrap();
        assert_eq!(url, "https://out/p1.png");
    }

    #[derive(Clone)]
    struct PollState {
        polls: Arc<AtomicUsize>,
        get_url: String,
    }

    #[tokio::test]
    async fn test_invoke_polls_until_done() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = PollState {
            polls: Arc::new(AtomicUsize::new(0)),
            get_url: format!("{}/v1/predictions/p2", base),
        };

        let app = Router::new()
            .route(
                "/v1/predictions",
                post(|State(state): State<PollState>| async move {
                    Json(json!({
                        "id": "p2",
                        "status": "starting",
                        "urls": { "get": state.get_url },
                    }))
                }),
            )
            .route(
                "/v1/predictions/p2",
                get(|State(state): State<PollState>| async move {
                    if state.polls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Json(json!({
                            "id": "p2",
                            "status": "processing",
                            "urls": { "get": state.get_url },
                        }))
                    } else {
                        Json(json!({
                            "id": "p2",
                            "status": "succeeded",
                            "output": ["https://out/p2.png"],
                        }))
                    }
                }),
            )
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = processor(&base)
            .invoke(&ImageJob::for_url("https://img/b.jpg"))
            .await
            .unwrap();

        assert_eq!(url, "https://out/p2.png");
        assert_eq!(state.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invoke_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new().route(
            "/v1/predictions",
            post(|| async {
                sleep(Duration::from_secs(5)).await;
                Json(json!({ "id": "slow", "status": "succeeded", "output": "x" }))
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let processor =
            ReplicateProcessor::new(&base, "t", "owner/model:v1", Duration::from_millis(200))
                .unwrap();
        let err = processor
            .invoke(&ImageJob::for_url("https://img/slow.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_invoke_failed_prediction_is_unavailable() {
        let app = Router::new().route(
            "/v1/predictions",
            post(|| async {
                Json(json!({ "id": "p3", "status": "failed", "error": "CUDA out of memory" }))
            }),
        );
        let base = serve(app).await;

        let err = processor(&base)
            .invoke(&ImageJob::for_url("https://img/c.jpg"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProcessorError::ServiceUnavailable("CUDA out of memory".to_string())
        );
    }

    #[tokio::test]
    async fn test_invoke_rejected_input() {
        let app = Router::new().route(
            "/v1/predictions",
            post(|| async {
                (
                    AxumStatus::UNPROCESSABLE_ENTITY,
                    Json(json!({ "detail": "image could not be fetched" })),
                )
            }),
        );
        let base = serve(app).await;

        let err = processor(&base)
            .invoke(&ImageJob::for_url("https://img/d.jpg"))
            .await
            .unwrap_err();
        match err {
            ProcessorError::InvalidInput(msg) => assert!(msg.contains("could not be fetched")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_unreachable_service() {
        let err = processor("http://127.0.0.1:1")
            .invoke(&ImageJob::for_url("https://img/e.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::ServiceUnavailable(_)));
    }
}
