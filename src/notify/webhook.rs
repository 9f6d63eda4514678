//! HTTP webhook sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{NotificationError, NotificationSink, WebhookPayload};

/// POSTs payloads as JSON. Any 2xx counts as delivered.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
}

impl WebhookSink {
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(
        &self,
        endpoint: &str,
        payload: &WebhookPayload,
    ) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout
                } else {
                    NotificationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotificationError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use tokio::sync::mpsc;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_deliver_posts_json() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    |State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                        tx.send(body).unwrap();
                        StatusCode::OK
                    },
                ),
            )
            .with_state(tx);
        let base = serve(app).await;

        let sink = WebhookSink::new(Duration::from_secs(5)).unwrap();
        let payload = WebhookPayload::success("req-9".into(), "https://out/9.png".into(), 1.0);
        sink.deliver(&format!("{}/hook", base), &payload).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received["request_id"], "req-9");
        assert_eq!(received["output_url"], "https://out/9.png");
    }

    #[tokio::test]
    async fn test_deliver_reports_status() {
        let app = Router::new().route("/hook", post(|| async { StatusCode::BAD_GATEWAY }));
        let base = serve(app).await;

        let sink = WebhookSink::new(Duration::from_secs(5)).unwrap();
        let payload = WebhookPayload::failure("r".into(), "e".into(), 0.0);
        let err = sink
            .deliver(&format!("{}/hook", base), &payload)
            .await
            .unwrap_err();
        assert_eq!(err, NotificationError::Status(502));
    }

    #[tokio::test]
    async fn test_deliver_times_out() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let base = serve(app).await;

        let sink = WebhookSink::new(Duration::from_millis(100)).unwrap();
        let payload = WebhookPayload::failure("r".into(), "e".into(), 0.0);
        let err = sink
            .deliver(&format!("{}/hook", base), &payload)
            .await
            .unwrap_err();
        assert_eq!(err, NotificationError::Timeout);
    }
}
