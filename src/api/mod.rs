//! API Module
//!
//! HTTP handlers, middleware and routing for the gateway REST API.
//!
//! # Endpoints
//! - `GET /` - Service info
//! - `GET /health` - Health check endpoint
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache` - Clear the cache
//! - `POST /api/v1/remove-background` - Remove the background of one image
//! - `POST /api/v1/remove-background/batch` - Process several images

pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod routes;

pub use handlers::*;
pub use middleware::RequestId;
pub use routes::create_router;
