//! The JSON envelope exchanged between devices through the relay.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::SyncError;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Discriminator of a [`SyncMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text clipboard content
    Text,
    /// A file carried as a data URL
    File,
    /// Liveness probe; answered with [`MessageKind::Pong`]
    Ping,
    /// Reply to a ping
    Pong,
    /// Any other type string from a foreign sender; treated as text
    #[serde(other)]
    Unknown,
}

/// Canonical message envelope.
///
/// Serialized as camelCase JSON:
/// `{ "type", "payload", "iv"?, "sender"?, "timestamp", "fileName"?, "fileType"? }`.
/// `iv` is present exactly when `payload` is ciphertext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    /// Message type
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Plaintext, data URL, or base64 ciphertext when `iv` is set
    #[serde(default)]
    pub payload: String,
    /// Base64 AES-GCM nonce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Sender's device name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Original file name for file messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// MIME type for file messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

impl SyncMessage {
    /// Build a text message stamped with the current time.
    pub fn text(payload: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            payload: payload.into(),
            iv: None,
            sender: Some(sender.into()),
            timestamp: now_millis(),
            file_name: None,
            file_type: None,
        }
    }

    /// Build a file message whose payload is a data URL.
    pub fn file(
        data_url: impl Into<String>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::File,
            payload: data_url.into(),
            iv: None,
            sender: Some(sender.into()),
            timestamp: now_millis(),
            file_name: Some(file_name.into()),
            file_type: Some(file_type.into()),
        }
    }

    /// Wrap raw text from a peer that does not speak the envelope format.
    pub fn fallback(raw: impl Into<String>, timestamp: u64) -> Self {
        Self {
            kind: MessageKind::Text,
            payload: raw.into(),
            iv: None,
            sender: Some("Unknown".to_string()),
            timestamp,
            file_name: None,
            file_type: None,
        }
    }

    /// Whether the payload is ciphertext.
    pub fn is_encrypted(&self) -> bool {
        self.iv.is_some()
    }

    /// Sender name, or `"Unknown"` when the peer did not set one.
    pub fn sender_or_unknown(&self) -> &str {
        match self.sender.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => "Unknown",
        }
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        serde_json::from_str(text).map_err(SyncError::Deserialization)
    }
}

// Payload may be plaintext clipboard content; keep it out of logs.
impl std::fmt::Debug for SyncMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncMessage")
            .field("kind", &self.kind)
            .field("payload", &format_args!("[{} bytes]", self.payload.len()))
            .field("encrypted", &self.is_encrypted())
            .field("sender", &self.sender)
            .field("timestamp", &self.timestamp)
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .finish()
    }
}
