//! Application state management for the server.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use axum::http::HeaderValue;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::health_stats::HealthStats;
use crate::publisher::{MetricsPublisher, PublisherSettings};
use crate::source::CounterSource;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and streams.
pub struct AppState {
    pub config: Arc<Config>,
    pub publisher: MetricsPublisher,
    pub health_stats: Arc<HealthStats>,
    /// Pre-validated value for `Access-Control-Allow-Origin`.
    pub cors_origin: HeaderValue,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds the state from an already validated config.
    pub fn new(
        config: Config,
        source: Arc<dyn CounterSource>,
    ) -> Result<Self, axum::http::header::InvalidHeaderValue> {
        let cors_origin = HeaderValue::from_str(config.cors_origin())?;
        let health_stats = Arc::new(HealthStats::new());
        let publisher = MetricsPublisher::new(
            source,
            PublisherSettings::from_config(&config),
            health_stats.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            publisher,
            health_stats,
            cors_origin,
            start_time: Instant::now(),
        })
    }
}
