//! Poll endpoint handlers.
//!
//! Every request takes a fresh sample; nothing is cached between requests.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{debug, instrument};

use crate::report::{DetailedReport, UsageReport};
use crate::state::SharedState;

/// Methods advertised to CORS preflight requests.
pub const ALLOWED_METHODS: &str = "GET, OPTIONS";
/// Request headers advertised to CORS preflight requests.
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Json<UsageReport> {
    state.health_stats.record_http_request();
    state.health_stats.record_poll_request();

    let report = state.publisher.poll().await;
    debug!("Serving /metrics: cpu={:?} ram={:?}", report.cpu, report.ram);
    Json(report)
}

/// Handler for the /metrics/details endpoint.
#[instrument(skip(state))]
pub async fn details_handler(State(state): State<SharedState>) -> Json<DetailedReport> {
    debug!("Processing /metrics/details request");
    state.health_stats.record_http_request();
    state.health_stats.record_poll_request();

    Json(state.publisher.details().await)
}

/// Handler for `OPTIONS` on the metrics endpoints.
///
/// Always answers 204 without touching the sampler. The allowed origin is
/// added by the router-wide CORS header layer.
pub async fn preflight_handler() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        ],
    )
}
