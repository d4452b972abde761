//! History entries.

use serde::{Deserialize, Serialize};

use crate::{MessageKind, SyncMessage};

/// Maximum number of entries kept in history.
pub const HISTORY_CAPACITY: usize = 50;

/// What a history entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Plain text
    Text,
    /// A file as a data URL
    File,
}

impl From<MessageKind> for ItemKind {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::File => ItemKind::File,
            _ => ItemKind::Text,
        }
    }
}

/// A sent or received clipboard entry.
///
/// Entries are immutable once created; `content` is always plaintext
/// (or a sentinel when decryption was impossible).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Unique id
    pub id: String,
    /// Plaintext or data URL
    pub content: String,
    /// Entry type
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Device name of the author
    pub sender: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// File name for file entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Whether this device authored the entry
    #[serde(default)]
    pub is_self: bool,
}

impl HistoryItem {
    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Entry for a message received from a peer, with `content` already decrypted.
    pub fn received(msg: &SyncMessage, content: String) -> Self {
        Self {
            id: Self::new_id(),
            content,
            kind: msg.kind.into(),
            sender: msg.sender_or_unknown().to_string(),
            timestamp: msg.timestamp,
            file_name: msg.file_name.clone(),
            is_self: false,
        }
    }

    /// Entry for content this device just sent.
    pub fn sent(
        kind: ItemKind,
        content: String,
        sender: &str,
        timestamp: u64,
        file_name: Option<String>,
    ) -> Self {
        Self {
            id: Self::new_id(),
            content,
            kind,
            sender: sender.to_string(),
            timestamp,
            file_name,
            is_self: true,
        }
    }
}

impl std::fmt::Debug for HistoryItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryItem")
            .field("id", &self.id)
            .field("content", &format_args!("[{} bytes]", self.content.len()))
            .field("kind", &self.kind)
            .field("sender", &self.sender)
            .field("timestamp", &self.timestamp)
            .field("file_name", &self.file_name)
            .field("is_self", &self.is_self)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_copies_metadata() {
        let mut msg = SyncMessage::file("data:,x", "x.bin", "application/octet-stream", "phone");
        msg.timestamp = 42;
        let item = HistoryItem::received(&msg, "data:,x".into());
        assert_eq!(item.kind, ItemKind::File);
        assert_eq!(item.sender, "phone");
        assert_eq!(item.timestamp, 42);
        assert_eq!(item.file_name.as_deref(), Some("x.bin"));
        assert!(!item.is_self);
    }

    #[test]
    fn ids_are_unique() {
        let a = HistoryItem::sent(ItemKind::Text, "a".into(), "me", 1, None);
        let b = HistoryItem::sent(ItemKind::Text, "a".into(), "me", 1, None);
        assert_ne!(a.id, b.id);
        assert!(a.is_self);
    }

    #[test]
    fn persisted_shape_is_camel_case() {
        let item = HistoryItem::sent(ItemKind::Text, "hi".into(), "me", 7, None);
        let json: serde_json::Value = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["isSelf"], true);
        assert!(json.get("fileName").is_none());
    }

    #[test]
    fn unknown_message_kind_becomes_text() {
        assert_eq!(ItemKind::from(MessageKind::Unknown), ItemKind::Text);
    }
}
