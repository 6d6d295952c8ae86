//! Server-Sent-Events endpoint handler.

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
};
use futures::StreamExt;
use tracing::{info, instrument};

use crate::state::SharedState;

/// Handler for the /metrics/stream endpoint.
///
/// Each tick becomes one `data: {...}` event. The stream lives until the
/// client disconnects, at which point hyper drops it on the next write.
#[instrument(skip(state))]
pub async fn stream_handler(State(state): State<SharedState>) -> impl IntoResponse {
    state.health_stats.record_http_request();
    info!(
        "Opening metrics stream ({} ms interval)",
        state.publisher.settings().interval.as_millis()
    );

    let events = state
        .publisher
        .stream()
        .map(|frame| Event::default().json_data(frame));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(events),
    )
}
