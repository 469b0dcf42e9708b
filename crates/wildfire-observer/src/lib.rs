//! Session API server for the Wildfire simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Session creation** (`POST /api/sessions`) from a sparse field,
//!   parameters, and coordinate index
//! - **Delta stream** (`GET /api/sessions/{id}/stream`) as server-sent
//!   events: one `delta` event per generation that changed something, then
//!   a single `complete` event when the fire burns out
//! - **Cancellation** (`DELETE /api/sessions/{id}`), idempotent
//! - **Operator status** (`GET /api/status`, `GET /api/sessions`)
//!
//! # Architecture
//!
//! Handlers are thin: every session operation goes through the shared
//! [`SessionManager`]. Each attached stream owns its session's loop; when
//! the HTTP client disconnects, the SSE body is dropped, which cancels the
//! session.
//!
//! [`SessionManager`]: wildfire_core::session::SessionManager

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod sse;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
