//! User settings.

use serde::{Deserialize, Serialize};

/// Relay URL used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:4000";

/// Persisted user settings.
///
/// Missing fields in stored JSON fall back to [`Settings::default`], so
/// older or partial records load cleanly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Relay WebSocket URL
    pub server_url: String,
    /// Name stamped on outgoing messages; also used for echo suppression
    pub device_name: String,
    /// Shared secret; empty disables encryption
    pub secret_key: String,
    /// Show notifications for incoming items
    pub enable_notifications: bool,
    /// Play a sound for incoming items
    pub enable_sound: bool,
}

impl Settings {
    /// Whether outgoing content is encrypted.
    pub fn encryption_enabled(&self) -> bool {
        !self.secret_key.is_empty()
    }

    /// Builder: set the relay URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Builder: set the device name.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Builder: set the shared secret.
    pub fn with_secret_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = secret.into();
        self
    }
}

fn default_device_name() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 1000;
    format!("Web-Client-{}", n)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            device_name: default_device_name(),
            secret_key: String::new(),
            enable_notifications: true,
            enable_sound: true,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("server_url", &self.server_url)
            .field("device_name", &self.device_name)
            .field(
                "secret_key",
                &if self.encryption_enabled() {
                    "[REDACTED]"
                } else {
                    "[none]"
                },
            )
            .field("enable_notifications", &self.enable_notifications)
            .field("enable_sound", &self.enable_sound)
            .finish()
    }
}
