//! Shared application state for the session API server.

use wildfire_core::config::SessionsConfig;
use wildfire_core::session::SessionManager;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The process-wide session registry.
    pub sessions: SessionManager,
}

impl AppState {
    /// Create application state with an empty registry.
    pub fn new(config: &SessionsConfig) -> Self {
        Self {
            sessions: SessionManager::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&SessionsConfig::default())
    }
}
