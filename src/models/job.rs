//! Job domain types shared by the orchestrator, the cache key and the
//! processing client.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FORMAT: &str = "png";
pub const DEFAULT_BACKGROUND_TYPE: &str = "rgba";

/// A validated background-removal job: exactly the parameters that
/// determine the produced image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageJob {
    /// Normalised http(s) URL of the source image
    pub image_url: String,
    /// Lower-case output format
    pub format: String,
    /// Remove the foreground instead of the background
    pub reverse: bool,
    /// Mask threshold in `[0, 1]`
    pub threshold: f64,
    /// `rgba`, `white`, `black` or a custom colour
    pub background_type: String,
}

impl ImageJob {
    /// A job for `image_url` with every option at its default.
    pub fn for_url(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            format: DEFAULT_FORMAT.to_string(),
            reverse: false,
            threshold: 0.0,
            background_type: DEFAULT_BACKGROUND_TYPE.to_string(),
        }
    }
}

/// Outcome of one successful job, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub success: bool,
    pub output_url: String,
    pub message: String,
    /// Seconds spent handling the job
    pub processing_time: f64,
    /// Whether the result came from the cache
    pub cached: bool,
    pub request_id: String,
}

impl JobOutcome {
    pub fn new(output_url: String, cached: bool, processing_time: f64, request_id: String) -> Self {
        let message = if cached {
            "Background removed successfully (cached)"
        } else {
            "Background removed successfully"
        };
        Self {
            success: true,
            output_url,
            message: message.to_string(),
            processing_time,
            cached,
            request_id,
        }
    }
}
