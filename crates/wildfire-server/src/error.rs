//! Error types for the Wildfire server binary.
//!
//! [`StartupError`] wraps every failure mode between process start and the
//! server accepting connections.

/// Top-level startup error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: wildfire_core::config::ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: wildfire_observer::ServerError,
    },
}
