//! HTTP endpoint handlers for the server.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/metrics`: one JSON usage report per request
//! - `/metrics/details`: usage report with byte figures
//! - `/metrics/stream`: Server-Sent-Events feed, one frame per tick
//! - `/health`: Health check endpoint
//! - `/`: endpoint index

pub mod health;
pub mod metrics;
pub mod root;
pub mod stream;

// Re-export handlers
pub use health::health_handler;
pub use metrics::{details_handler, metrics_handler, preflight_handler};
pub use root::root_handler;
pub use stream::stream_handler;
