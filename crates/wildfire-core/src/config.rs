//! Configuration loading and typed config structures for the Wildfire service.
//!
//! The canonical configuration lives in `wildfire-config.yaml` next to the
//! binary's working directory. Every field has a default, so an empty or
//! missing file yields a working service.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//! sessions:
//!   max_live: 1024
//!   retired_capacity: 4096
//!   max_cells: 1000000
//!   default_state: Tree
//! logging:
//!   level: info
//! ```

use std::path::Path;

use serde::Deserialize;
use wildfire_types::CellState;
use wildfire_world::ReconstructionConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    Env {
        /// The environment variable.
        name: &'static str,
        /// Its raw value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Session registry and streaming settings.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `WILDFIRE_HOST` overrides `server.host`
    /// - `WILDFIRE_PORT` overrides `server.port`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Default configuration with env overrides applied. Used when no
    /// config file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string only.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSection {
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("WILDFIRE_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("WILDFIRE_PORT") {
            self.port = port.parse().map_err(|_e| ConfigError::Env {
                name: "WILDFIRE_PORT",
                value: port.clone(),
            })?;
        }
        Ok(())
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

/// Session registry and streaming settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionsConfig {
    /// Most sessions (created or streaming) held at once. Further creates
    /// are refused until one ends.
    #[serde(default = "default_max_live")]
    pub max_live: usize,

    /// How many finished session ids are remembered so that a late cancel
    /// still succeeds.
    #[serde(default = "default_retired_capacity")]
    pub retired_capacity: usize,

    /// Largest accepted `width * height`.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,

    /// State of cells the client did not describe.
    #[serde(default)]
    pub default_state: CellState,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_live: default_max_live(),
            retired_capacity: default_retired_capacity(),
            max_cells: default_max_cells(),
            default_state: CellState::Tree,
        }
    }
}

impl SessionsConfig {
    /// The reconstruction policy these settings describe.
    pub const fn reconstruction(&self) -> ReconstructionConfig {
        ReconstructionConfig {
            default_state: self.default_state,
            max_cells: Some(self.max_cells),
        }
    }
}

const fn default_max_live() -> usize {
    1024
}

const fn default_retired_capacity() -> usize {
    4096
}

const fn default_max_cells() -> usize {
    1_000_000
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    String::from("info")
}
