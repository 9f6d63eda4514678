//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies and their
//! validation into [`ImageJob`]s.

use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::{GatewayError, Result};
use crate::models::job::{ImageJob, DEFAULT_BACKGROUND_TYPE, DEFAULT_FORMAT};

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_background_type() -> String {
    DEFAULT_BACKGROUND_TYPE.to_string()
}

// Explicit `null` reads the same as an omitted field.

fn nullable_format<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_format))
}

fn nullable_background_type<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_background_type))
}

fn nullable<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Request body for `POST {prefix}/remove-background`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveBackgroundRequest {
    /// URL of the image to process
    pub image_url: String,
    /// Output format (default: png)
    #[serde(default = "default_format", deserialize_with = "nullable_format")]
    pub format: String,
    /// Remove the foreground instead of the background
    #[serde(default, deserialize_with = "nullable")]
    pub reverse: bool,
    /// Threshold for background removal, 0 to 1
    #[serde(default, deserialize_with = "nullable")]
    pub threshold: f64,
    /// Background type (default: rgba)
    #[serde(default = "default_background_type", deserialize_with = "nullable_background_type")]
    pub background_type: String,
    /// Optional endpoint notified when the job finishes
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl RemoveBackgroundRequest {
    /// A request for `image_url` with every option at its default.
    pub fn for_url(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            format: default_format(),
            reverse: false,
            threshold: 0.0,
            background_type: default_background_type(),
            webhook_url: None,
        }
    }

    /// Validates the request and returns the normalised job.
    pub fn validate(&self, allowed_formats: &[String]) -> Result<ImageJob> {
        let image_url = validate_http_url("image_url", &self.image_url)?;

        if let Some(webhook) = &self.webhook_url {
            validate_http_url("webhook_url", webhook)?;
        }

        let format = self.format.trim().to_ascii_lowercase();
        if !allowed_formats.iter().any(|f| *f == format) {
            return Err(GatewayError::InvalidInput(format!(
                "Invalid format '{}'. Allowed: {}",
                self.format,
                allowed_formats.join(", ")
            )));
        }

        // NaN fails the range check as well
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(GatewayError::InvalidInput(
                "threshold must be between 0 and 1".to_string(),
            ));
        }

        let background_type = self.background_type.trim();
        if background_type.is_empty() {
            return Err(GatewayError::InvalidInput(
                "background_type cannot be empty".to_string(),
            ));
        }

        Ok(ImageJob {
            image_url,
            format,
            reverse: self.reverse,
            threshold: self.threshold,
            background_type: background_type.to_string(),
        })
    }
}

/// Request body for `POST {prefix}/remove-background/batch`
///
/// All images share the same output options.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub image_urls: Vec<String>,
    #[serde(default = "default_format", deserialize_with = "nullable_format")]
    pub format: String,
    #[serde(default, deserialize_with = "nullable")]
    pub reverse: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub threshold: f64,
    #[serde(default = "default_background_type", deserialize_with = "nullable_background_type")]
    pub background_type: String,
}

impl BatchRequest {
    /// Expands the batch into one job request per image, in order.
    pub fn into_jobs(self) -> Vec<RemoveBackgroundRequest> {
        let Self {
            image_urls,
            format,
            reverse,
            threshold,
            background_type,
        } = self;

        image_urls
            .into_iter()
            .map(|image_url| RemoveBackgroundRequest {
                image_url,
                format: format.clone(),
                reverse,
                threshold,
                background_type: background_type.clone(),
                webhook_url: None,
            })
            .collect()
    }
}

/// Parses `raw` as an absolute http(s) URL with a host.
fn validate_http_url(field: &str, raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| GatewayError::InvalidInput(format!("Invalid {} format: {}", field, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidInput(format!(
            "{} must use http or https",
            field
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(GatewayError::InvalidInput(format!(
            "{} must include a host",
            field
        )));
    }

    Ok(parsed.to_string())
}
