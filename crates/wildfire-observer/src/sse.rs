//! Server-sent event handler for a session's delta stream.
//!
//! Clients connect to `GET /api/sessions/{id}/stream` and receive:
//!
//! - `event: delta` with a JSON [`DeltaPayload`] for every generation that
//!   changed at least one cell
//! - `event: complete` with empty data, once, when the fire burns out
//!
//! The stream simply ends if the session is cancelled. If the client goes
//! away, Axum drops the response body, which drops the underlying
//! [`DeltaStream`] and cancels the session.
//!
//! [`DeltaPayload`]: wildfire_types::DeltaPayload
//! [`DeltaStream`]: wildfire_core::stream::DeltaStream

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt as _};
use tracing::debug;
use wildfire_core::stream::StreamEvent;

use crate::error::ApiError;
use crate::handlers::parse_session_id;
use crate::state::AppState;

/// SSE event name for a generation delta.
pub const DELTA_EVENT: &str = "delta";

/// SSE event name for natural completion.
pub const COMPLETE_EVENT: &str = "complete";

/// Attach to a session and stream its events.
///
/// # Route
///
/// `GET /api/sessions/{id}/stream`
pub async fn stream_session(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, serde_json::Error>>>, ApiError> {
    let id = parse_session_id(&id_str)?;
    let deltas = state.sessions.attach_stream(id).await?;
    debug!(session_id = %id, "SSE client attached");

    let events = deltas.map(|event| to_sse_event(&event));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Frame one stream event for the wire.
fn to_sse_event(event: &StreamEvent) -> Result<Event, serde_json::Error> {
    match event {
        StreamEvent::Delta(payload) => {
            let json = serde_json::to_string(payload)?;
            Ok(Event::default().event(DELTA_EVENT).data(json))
        }
        StreamEvent::Complete => Ok(Event::default().event(COMPLETE_EVENT).data("")),
    }
}
