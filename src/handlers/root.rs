//! Root endpoint handler listing the available endpoints.

use axum::{extract::State, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let settings = state.publisher.settings();
    let mut out = String::new();
    writeln!(out, "HERAKLES PULSE {}", env!("CARGO_PKG_VERSION")).ok();
    writeln!(out, "Uptime: {}h {}m {}s", hours, minutes, seconds).ok();
    writeln!(out).ok();
    writeln!(out, "GET  /metrics          current cpu/ram usage as JSON").ok();
    writeln!(out, "GET  /metrics/details  usage with byte figures and process footprint").ok();
    writeln!(
        out,
        "GET  /metrics/stream   Server-Sent-Events, one frame every {} ms",
        settings.interval.as_millis()
    )
    .ok();
    if state.config.enable_health.unwrap_or(true) {
        writeln!(out, "GET  /health           server statistics").ok();
    }
    writeln!(out).ok();
    writeln!(out, "Unavailable metrics are reported as -1.").ok();
    writeln!(out).ok();
    write!(out, "{FOOTER_TEXT}").ok();

    ([("Content-Type", "text/plain; charset=utf-8")], out)
}
