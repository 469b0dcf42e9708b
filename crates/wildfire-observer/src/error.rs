//! Error types for the session API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;
use wildfire_core::session::SessionError;

/// Errors that can occur in the session API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or its contents are unusable.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the session's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The service cannot take more sessions right now.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::MissingInput(_)
            | SessionError::InvalidInput(_)
            | SessionError::Params { .. }
            | SessionError::Grid { .. } => Self::BadRequest(message),
            SessionError::UnknownSession(_) => Self::NotFound(message),
            SessionError::AlreadyStreaming(_) => Self::Conflict(message),
            SessionError::AtCapacity { .. } => Self::Unavailable(message),
            SessionError::Internal(_) => {
                error!(error = %message, "Internal error while handling session request");
                Self::Internal(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) | Self::InvalidUuid(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
