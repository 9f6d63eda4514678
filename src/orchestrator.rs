//! Request Orchestrator
//!
//! Runs one background-removal job end to end: validate, derive the cache
//! key, consult the cache, call the processing service on a miss, store the
//! result, and hand the outcome to the webhook dispatcher.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::cache::{derive_key, SharedCache};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::models::{
    BatchItemResult, BatchResponse, ImageJob, JobOutcome, RemoveBackgroundRequest,
};
use crate::notify::{NotificationDispatcher, WebhookPayload};
use crate::processor::ImageProcessor;

/// The configuration subset the orchestrator acts on.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub cache_enabled: bool,
    /// TTL in seconds for freshly produced results
    pub cache_ttl: i64,
    pub max_batch_size: usize,
    pub batch_concurrency: usize,
    pub webhook_enabled: bool,
    pub allowed_formats: Vec<String>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_enabled: config.cache_enabled,
            cache_ttl: config.cache_ttl,
            max_batch_size: config.max_batch_size.get(),
            batch_concurrency: config.batch_concurrency.get(),
            webhook_enabled: config.webhook_enabled,
            allowed_formats: config.allowed_formats.clone(),
        }
    }
}

/// Coordinates cache, processing service and notifications.
pub struct Orchestrator {
    cache: SharedCache,
    processor: Arc<dyn ImageProcessor>,
    notifier: Option<NotificationDispatcher>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        cache: SharedCache,
        processor: Arc<dyn ImageProcessor>,
        notifier: Option<NotificationDispatcher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            cache,
            processor,
            notifier,
            settings,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Single Job ==
    /// Processes one job.
    ///
    /// Invalid input fails before the cache is consulted and is never
    /// notified. Every other outcome (cache hit, fresh result, service
    /// failure) is sent to the webhook when one was supplied.
    pub async fn process(
        &self,
        request: RemoveBackgroundRequest,
        request_id: String,
    ) -> Result<JobOutcome> {
        let started = Instant::now();
        let job = request.validate(&self.settings.allowed_formats)?;

        let result = self.resolve(&job).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok((url, cached)) => info!(
                request_id = %request_id,
                cached,
                "Successfully processed image in {:.2}s. Output: {}", elapsed, url
            ),
            Err(err) => error!(request_id = %request_id, error = %err, "Processing failed"),
        }

        if let Some(endpoint) = request.webhook_url.as_deref() {
            let payload = match &result {
                Ok((url, _)) => WebhookPayload::success(request_id.clone(), url.clone(), elapsed),
                Err(err) => WebhookPayload::failure(request_id.clone(), err.to_string(), elapsed),
            };
            self.notify(endpoint, payload);
        }

        let (output_url, cached) = result?;
        Ok(JobOutcome::new(output_url, cached, elapsed, request_id))
    }

    // == Batch ==
    /// Processes a batch of jobs, reporting success or failure per item.
    ///
    /// The size limit is checked before anything runs. Items run with
    /// bounded concurrency and results keep input order. Individual
    /// failures never fail the batch.
    pub async fn process_batch(
        &self,
        requests: Vec<RemoveBackgroundRequest>,
        request_id: String,
    ) -> Result<BatchResponse> {
        if requests.len() > self.settings.max_batch_size {
            return Err(GatewayError::InvalidInput(format!(
                "Maximum {} images per batch request",
                self.settings.max_batch_size
            )));
        }

        let started = Instant::now();
        info!(request_id = %request_id, items = requests.len(), "Processing batch");

        let results: Vec<BatchItemResult> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                let item_id = format!("{}-{}", request_id, index);
                async move {
                    let input_url = request.image_url.clone();
                    match self.process(request, item_id).await {
                        Ok(outcome) => {
                            BatchItemResult::succeeded(input_url, outcome.output_url, outcome.cached)
                        }
                        Err(err) => BatchItemResult::failed(input_url, err.to_string()),
                    }
                }
            })
            .buffered(self.settings.batch_concurrency.max(1))
            .collect()
            .await;

        let response = BatchResponse::new(results, started.elapsed().as_secs_f64());
        info!(
            request_id = %request_id,
            total = response.total,
            successful = response.successful,
            failed = response.failed,
            "Batch finished"
        );
        Ok(response)
    }

    /// Returns the result URL for a job and whether it came from the cache.
    async fn resolve(&self, job: &ImageJob) -> Result<(String, bool)> {
        if !self.settings.cache_enabled {
            let url = self.processor.invoke(job).await?;
            return Ok((url, false));
        }

        let key = derive_key(job);
        if let Some(url) = self.cache.get(&key).await {
            return Ok((url, true));
        }

        info!(image = %job.image_url, "Processing image");
        let url = self.processor.invoke(job).await?;
        self.cache
            .set(&key, url.clone(), Some(self.settings.cache_ttl))
            .await;
        Ok((url, false))
    }

    fn notify(&self, endpoint: &str, payload: WebhookPayload) {
        if !self.settings.webhook_enabled {
            return;
        }
        if let Some(notifier) = &self.notifier {
            // Failures are logged by the dispatcher
            let _ = notifier.dispatch(endpoint, payload);
        }
    }
}
