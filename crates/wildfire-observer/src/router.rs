//! Axum router construction for the session API.
//!
//! Assembles all routes into a single [`Router`] with CORS enabled so the
//! browser client can be served from another origin.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::sse;
use crate::state::AppState;

/// Build the complete Axum router for the session API.
///
/// The router includes:
/// - `POST /api/sessions` -- create a session
/// - `GET /api/sessions` -- list live sessions
/// - `GET /api/sessions/{id}/stream` -- SSE delta stream
/// - `DELETE /api/sessions/{id}` -- cancel a session
/// - `GET /api/status` -- service status
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/api/sessions/{id}", delete(handlers::cancel_session))
        .route("/api/sessions/{id}/stream", get(sse::stream_session))
        .route("/api/status", get(handlers::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
