//! Processing Service Module
//!
//! The external call that turns an [`ImageJob`] into a result URL.
//! Production traffic goes to a hosted prediction API; tests plug in their
//! own [`ImageProcessor`].

mod replicate;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ImageJob;

pub use replicate::ReplicateProcessor;

/// Failure classes of the processing service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    /// Service down, overloaded, timed out, or the prediction failed
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The service rejected the job parameters
    #[error("{0}")]
    InvalidInput(String),

    /// A response we could not interpret
    #[error("{0}")]
    Unknown(String),
}

/// Produces a processed image for a job. May take tens of seconds.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn invoke(&self, job: &ImageJob) -> Result<String, ProcessorError>;
}
