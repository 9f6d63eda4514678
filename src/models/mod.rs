//! Request, response and job models for the gateway
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP bodies, and the validated job type the
//! rest of the crate works with.

pub mod job;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use job::{ImageJob, JobOutcome};
pub use requests::{BatchRequest, RemoveBackgroundRequest};
pub use responses::{
    BatchItemResult, BatchResponse, CacheStatsResponse, HealthResponse, MessageResponse,
    ServiceInfo,
};
