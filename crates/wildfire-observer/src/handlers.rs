//! REST handlers for creating, cancelling, and inspecting sessions.
//!
//! Each handler is a thin adapter between HTTP and the shared
//! [`SessionManager`](wildfire_core::session::SessionManager).

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;
use uuid::Uuid;
use wildfire_types::{CancelResponse, CreateSessionRequest, CreateSessionResponse, SessionId};

use crate::error::ApiError;
use crate::state::AppState;

/// Parse a session id from a path segment.
pub(crate) fn parse_session_id(s: &str) -> Result<SessionId, ApiError> {
    s.parse::<Uuid>()
        .map(SessionId::from)
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}

// ---------------------------------------------------------------------------
// POST /api/sessions -- create a session
// ---------------------------------------------------------------------------

/// Create a session from a sparse field, parameters, and coordinate index.
///
/// Returns `201 Created` with the new session id. Missing or malformed
/// input yields `400 Bad Request` with the reason.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let session_id = state.sessions.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    ))
}

// ---------------------------------------------------------------------------
// DELETE /api/sessions/:id -- cancel a session
// ---------------------------------------------------------------------------

/// Cancel a session.
///
/// Idempotent: cancelling a session that already completed or was already
/// cancelled succeeds with outcome `alreadyFinished`. Unknown ids yield
/// `404 Not Found`.
pub async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_session_id(&id_str)?;
    let outcome = state.sessions.cancel(id).await?;
    debug!(session_id = %id, ?outcome, "Cancel request handled");
    Ok(Json(CancelResponse { ok: true, outcome }))
}

// ---------------------------------------------------------------------------
// GET /api/sessions -- list live sessions
// ---------------------------------------------------------------------------

/// List live sessions with their phase and creation time.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.summaries().await;
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/status -- service status
// ---------------------------------------------------------------------------

/// Service version and live session count.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "liveSessions": state.sessions.live_count().await,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
