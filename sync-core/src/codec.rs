//! Inbound frame normalization.
//!
//! Peers range from full ClipSync clients to a bare `wscat` session, so an
//! inbound frame may be binary, raw text, a [`SyncMessage`] or a pairing
//! [`ControlMessage`]. [`decode_frame`] folds all of them into one tagged
//! result; nothing here touches the network.

use clipsync_types::{ControlMessage, SyncError, SyncMessage};
use serde_json::Value;
use thiserror::Error;

/// A raw transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
}

/// Why a frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Binary frame that is not valid UTF-8.
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,
    /// Control message with a known type but the wrong fields.
    #[error("malformed control message: {0}")]
    MalformedControl(String),
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A well-formed envelope.
    Message(SyncMessage),
    /// A pairing control message.
    Control(ControlMessage),
    /// Text that is not an envelope; shown as-is from `Unknown`.
    FallbackText(String),
    /// Unusable frame; log and move on.
    Drop(DecodeError),
}

impl Decoded {
    /// Collapse into an envelope, materializing fallback text at `now`.
    ///
    /// Control messages and dropped frames yield `None`.
    pub fn into_message(self, now: u64) -> Option<SyncMessage> {
        match self {
            Decoded::Message(msg) => Some(msg),
            Decoded::FallbackText(raw) => Some(SyncMessage::fallback(raw, now)),
            Decoded::Control(_) | Decoded::Drop(_) => None,
        }
    }
}

/// Decode one inbound frame.
pub fn decode_frame(frame: Frame) -> Decoded {
    let text = match frame {
        Frame::Text(text) => text,
        Frame::Binary(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return Decoded::Drop(DecodeError::InvalidUtf8),
        },
    };

    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => return Decoded::FallbackText(text),
    };

    if let Some(type_name) = value.get("type").and_then(Value::as_str) {
        if ControlMessage::is_control_type(type_name) {
            return match serde_json::from_value(value) {
                Ok(control) => Decoded::Control(control),
                Err(e) => Decoded::Drop(DecodeError::MalformedControl(e.to_string())),
            };
        }
    }

    if is_truthy(value.get("type")) && is_truthy(value.get("timestamp")) {
        if let Ok(msg) = serde_json::from_value::<SyncMessage>(value) {
            return Decoded::Message(msg);
        }
    }

    Decoded::FallbackText(text)
}

/// Present and not `null`, `false`, `0` or `""`.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Serialize an envelope into a text frame.
pub fn encode(msg: &SyncMessage) -> Result<Frame, SyncError> {
    msg.to_json().map(Frame::Text)
}

/// Serialize a control message into a text frame.
pub fn encode_control(msg: &ControlMessage) -> Result<Frame, SyncError> {
    msg.to_json().map(Frame::Text)
}

/// Whether `msg` is our own message reflected back by the relay.
pub fn is_echo(msg: &SyncMessage, device_name: &str) -> bool {
    msg.sender.as_deref() == Some(device_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_types::MessageKind;

    fn text(s: &str) -> Frame {
        Frame::Text(s.to_string())
    }

    // ===========================================
    // Envelopes
    // ===========================================

    #[test]
    fn decodes_well_formed_envelope() {
        let decoded = decode_frame(text(
            r#"{"type":"text","payload":"hi","sender":"desk","timestamp":1700000000000}"#,
        ));
        match decoded {
            Decoded::Message(msg) => {
                assert_eq!(msg.kind, MessageKind::Text);
                assert_eq!(msg.payload, "hi");
                assert_eq!(msg.sender.as_deref(), Some("desk"));
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn binary_frame_is_decoded_as_text_first() {
        let json = br#"{"type":"text","payload":"bin","timestamp":9}"#.to_vec();
        assert!(matches!(
            decode_frame(Frame::Binary(json)),
            Decoded::Message(msg) if msg.payload == "bin"
        ));
    }

    #[test]
    fn invalid_utf8_binary_is_dropped() {
        assert_eq!(
            decode_frame(Frame::Binary(vec![0xff, 0xfe, 0x00])),
            Decoded::Drop(DecodeError::InvalidUtf8)
        );
    }

    // ===========================================
    // Fallback
    // ===========================================

    #[test]
    fn raw_text_falls_back() {
        let decoded = decode_frame(text("hello"));
        assert_eq!(decoded, Decoded::FallbackText("hello".into()));

        let msg = decoded.into_message(1234).unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.payload, "hello");
        assert_eq!(msg.sender.as_deref(), Some("Unknown"));
        assert_eq!(msg.timestamp, 1234);
        assert!(msg.iv.is_none());
    }

    #[test]
    fn json_without_timestamp_falls_back_to_raw_text() {
        let raw = r#"{"type":"text","payload":"x"}"#;
        assert_eq!(decode_frame(text(raw)), Decoded::FallbackText(raw.into()));
    }

    #[test]
    fn json_with_zero_timestamp_falls_back() {
        let raw = r#"{"type":"text","payload":"x","timestamp":0}"#;
        assert_eq!(decode_frame(text(raw)), Decoded::FallbackText(raw.into()));
    }

    #[test]
    fn json_of_other_shape_falls_back() {
        for raw in ["42", "[1,2]", "\"quoted\"", r#"{"hello":"world"}"#] {
            assert_eq!(decode_frame(text(raw)), Decoded::FallbackText(raw.into()));
        }
    }

    #[test]
    fn truthy_fields_with_wrong_types_fall_back() {
        let raw = r#"{"type":"text","payload":7,"timestamp":"yesterday"}"#;
        assert_eq!(decode_frame(text(raw)), Decoded::FallbackText(raw.into()));
    }

    // ===========================================
    // Control messages
    // ===========================================

    #[test]
    fn decodes_control_message() {
        assert_eq!(
            decode_frame(text(r#"{"type":"REGISTER_ACK"}"#)),
            Decoded::Control(ControlMessage::RegisterAck)
        );
    }

    #[test]
    fn malformed_control_is_dropped() {
        assert!(matches!(
            decode_frame(text(r#"{"type":"DEVICE_JOINED"}"#)),
            Decoded::Drop(DecodeError::MalformedControl(_))
        ));
    }

    #[test]
    fn control_and_drop_do_not_become_messages() {
        assert!(Decoded::Control(ControlMessage::RegisterAck)
            .into_message(1)
            .is_none());
        assert!(Decoded::Drop(DecodeError::InvalidUtf8)
            .into_message(1)
            .is_none());
    }

    // ===========================================
    // Encoding and echo
    // ===========================================

    #[test]
    fn encoded_envelope_decodes_back() {
        let msg = SyncMessage::text("round", "laptop");
        let frame = encode(&msg).unwrap();
        assert_eq!(decode_frame(frame), Decoded::Message(msg));
    }

    #[test]
    fn echo_matches_exact_sender() {
        let msg = SyncMessage::text("x", "laptop");
        assert!(is_echo(&msg, "laptop"));
        assert!(!is_echo(&msg, "Laptop"));
        assert!(!is_echo(&SyncMessage::fallback("x", 1), "laptop"));
    }
}
