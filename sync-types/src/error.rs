//! Error types for ClipSync.

use thiserror::Error;

/// Errors that can occur while handling ClipSync wire data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// File exceeds the transfer limit
    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge {
        /// Size of the rejected file
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Invalid pairing code
    #[error("invalid pairing code: {0}")]
    InvalidPairingCode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::FileTooLarge { size: 10, max: 5 };
        assert_eq!(err.to_string(), "file too large: 10 bytes (max 5)");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
