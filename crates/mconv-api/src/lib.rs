//! Axum HTTP/WS media conversion server.
//!
//! This crate provides:
//! - Multipart conversion endpoints backed by the job runner
//! - A WebSocket progress feed for every running job
//! - Static serving of finished outputs
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
