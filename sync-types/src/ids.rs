//! Identity types for ClipSync.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SyncError;

/// Short random identifier for a device in a pairing session.
///
/// Eight lowercase hex characters taken from a v4 UUID. Only needs to be
/// unique among the handful of devices sharing one pairing code.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Length of a generated id in characters.
    pub const LEN: usize = 8;

    /// Create a new random DeviceId.
    pub fn random() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self(simple[..Self::LEN].to_string())
    }

    /// Wrap an id received from a peer.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

/// A shared pairing token.
///
/// Groups devices on the relay and doubles as the key-derivation input,
/// so it is redacted from debug output.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingCode(String);

impl PairingCode {
    /// Maximum accepted length.
    pub const MAX_LEN: usize = 128;

    /// Validate and normalize a user-entered code.
    ///
    /// Surrounding whitespace is trimmed. Empty codes, codes with inner
    /// whitespace and overlong codes are rejected.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(SyncError::InvalidPairingCode("empty".into()));
        }
        if code.len() > Self::MAX_LEN {
            return Err(SyncError::InvalidPairingCode(format!(
                "longer than {} characters",
                Self::MAX_LEN
            )));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(SyncError::InvalidPairingCode(
                "contains whitespace".into(),
            ));
        }
        Ok(Self(code.to_string()))
    }

    /// Borrow the code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingCode([REDACTED; {} chars])", self.0.len())
    }
}
