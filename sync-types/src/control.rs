//! Control frames for the pairing-code variant.
//!
//! A device joins a pairing session by sending [`ControlMessage::Register`];
//! the relay answers with [`ControlMessage::RegisterAck`] and announces
//! arrivals and departures to the rest of the session. Clipboard content
//! travels as [`ControlMessage::ClipboardUpdate`], always encrypted with the
//! key derived from the pairing code.

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// All pairing-variant control messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Join the session identified by `pairing_code`
    #[serde(rename_all = "camelCase")]
    Register {
        /// Shared pairing code
        pairing_code: String,
        /// Registering device
        id: String,
    },
    /// Relay accepted the registration
    RegisterAck,
    /// Another device joined the session
    #[serde(rename_all = "camelCase")]
    DeviceJoined {
        /// The joining device
        device_id: String,
    },
    /// A device left the session
    #[serde(rename_all = "camelCase")]
    DeviceLeft {
        /// The departing device
        device_id: String,
    },
    /// Encrypted clipboard content
    #[serde(rename_all = "camelCase")]
    ClipboardUpdate {
        /// Base64 ciphertext
        payload: String,
        /// Base64 nonce
        iv: String,
        /// Milliseconds since the Unix epoch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        /// Originating device
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<String>,
    },
}

impl ControlMessage {
    /// Wire names of every control message type.
    pub const TYPES: [&'static str; 5] = [
        "REGISTER",
        "REGISTER_ACK",
        "DEVICE_JOINED",
        "DEVICE_LEFT",
        "CLIPBOARD_UPDATE",
    ];

    /// Whether `type_name` is one of the control message types.
    pub fn is_control_type(type_name: &str) -> bool {
        Self::TYPES.contains(&type_name)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_wire_shape() {
        let msg = ControlMessage::Register {
            pairing_code: "BLUE-42".into(),
            id: "abcd1234".into(),
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "REGISTER");
        assert_eq!(json["pairingCode"], "BLUE-42");
        assert_eq!(json["id"], "abcd1234");
    }

    #[test]
    fn register_ack_ignores_extra_fields() {
        let msg = ControlMessage::from_json(r#"{"type":"REGISTER_ACK","room":"x"}"#).unwrap();
        assert_eq!(msg, ControlMessage::RegisterAck);
    }

    #[test]
    fn clipboard_update_optional_fields() {
        let msg =
            ControlMessage::from_json(r#"{"type":"CLIPBOARD_UPDATE","payload":"p","iv":"i"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ControlMessage::ClipboardUpdate {
                payload: "p".into(),
                iv: "i".into(),
                timestamp: None,
                sender_id: None,
            }
        );
    }

    #[test]
    fn device_joined_parses_camel_case() {
        let msg =
            ControlMessage::from_json(r#"{"type":"DEVICE_JOINED","deviceId":"ffff0000"}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::DeviceJoined {
                device_id: "ffff0000".into()
            }
        );
    }

    #[test]
    fn control_type_names() {
        assert!(ControlMessage::is_control_type("REGISTER_ACK"));
        assert!(!ControlMessage::is_control_type("text"));
    }
}
