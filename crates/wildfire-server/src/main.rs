//! Wildfire simulation service binary.
//!
//! Wires configuration, logging, the session registry, and the HTTP server
//! together, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `wildfire-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Create the session registry
//! 4. Serve the session API until shutdown

mod error;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wildfire_core::config::ServiceConfig;
use wildfire_observer::{AppState, ServerConfig};

use crate::error::StartupError;

/// Default location of the configuration file.
const CONFIG_PATH: &str = "wildfire-config.yaml";

/// Application entry point for the Wildfire service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config = load_config(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        host = config.server.host,
        port = config.server.port,
        max_live = config.sessions.max_live,
        retired_capacity = config.sessions.retired_capacity,
        max_cells = config.sessions.max_cells,
        "wildfire-server starting"
    );

    // 3. Create the session registry.
    let state = Arc::new(AppState::new(&config.sessions));

    // 4. Serve until Ctrl-C.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    wildfire_observer::start_server(&server_config, state, shutdown_signal())
        .await
        .map_err(StartupError::from)?;

    info!("wildfire-server shutdown complete");
    Ok(())
}

/// Load the service configuration, falling back to defaults when the file
/// does not exist.
fn load_config(path: &Path) -> Result<ServiceConfig, StartupError> {
    if path.exists() {
        Ok(ServiceConfig::from_file(path)?)
    } else {
        Ok(ServiceConfig::from_env()?)
    }
}

/// Resolve when the process receives `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown signal received");
}
