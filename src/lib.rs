//! Cutout Gateway - A background-removal API gateway
//!
//! Fronts an external background-removal model with a TTL/LRU response
//! cache, batch processing and fire-and-forget webhook notifications.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod processor;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
