//! HTTP route table.

use axum::{http::header, routing::get, Router};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::debug;

use crate::handlers::{
    details_handler, health_handler, metrics_handler, preflight_handler, root_handler,
    stream_handler,
};
use crate::state::SharedState;

/// Builds the router serving all endpoints.
///
/// Every response, including 404s and preflights, carries the configured
/// `Access-Control-Allow-Origin`.
pub fn build_router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler).options(preflight_handler))
        .route("/metrics/details", get(details_handler).options(preflight_handler))
        .route(
            "/metrics/stream",
            get(stream_handler).options(preflight_handler),
        );

    if state.config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    } else {
        debug!("/health endpoint disabled by configuration");
    }

    app.layer(SetResponseHeaderLayer::overriding(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        state.cors_origin.clone(),
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
