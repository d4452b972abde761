//! Configuration loading for clipsync-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`). Every
//! field has a default, and a missing file means "all defaults".

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration for clipsync-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection and frame limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP/WebSocket listener (default: 0.0.0.0:4000).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Connection and frame limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent WebSocket peers (default: 1024).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Largest accepted frame in bytes (default: 16 MiB). An encrypted file
    /// is base64-encoded twice, so a 5 MiB file needs roughly 9.3 MiB.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Frames queued per peer before new ones are dropped (default: 64).
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

// Default value functions
fn default_bind_address() -> String {
    format!("0.0.0.0:{}", clipsync_types::DEFAULT_PORT)
}

fn default_max_connections() -> usize {
    1024
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

fn default_outbox_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_message_size: default_max_message_size(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parsed bind address, with `port` replacing the configured port.
    pub fn bind_addr(&self, port: Option<u16>) -> Result<SocketAddr, ConfigError> {
        let mut addr: SocketAddr =
            self.server
                .bind_address
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddress {
                    address: self.server.bind_address.clone(),
                    source: e,
                })?;
        if let Some(port) = port {
            addr.set_port(port);
        }
        Ok(addr)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// `bind_address` is not a socket address.
    #[error("invalid bind address {address}: {source}")]
    InvalidBindAddress {
        /// The configured address.
        address: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },
}
