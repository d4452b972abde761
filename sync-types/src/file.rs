//! Files travel inline as `data:<mime>;base64,<bytes>` URLs.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::SyncError;

/// Largest file accepted for transfer (5 MiB).
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// MIME type
    pub mime: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

/// Encode file bytes as a base64 data URL.
///
/// Fails with [`SyncError::FileTooLarge`] above [`MAX_FILE_SIZE`].
pub fn to_data_url(mime: &str, bytes: &[u8]) -> Result<String, SyncError> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(SyncError::FileTooLarge {
            size: bytes.len(),
            max: MAX_FILE_SIZE,
        });
    }
    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Decode a base64 data URL.
pub fn parse_data_url(url: &str) -> Result<DataUrl, SyncError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SyncError::InvalidData("not a data URL".into()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| SyncError::InvalidData("data URL has no payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| SyncError::InvalidData("data URL is not base64".into()))?;
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| SyncError::InvalidData(format!("bad base64: {}", e)))?;
    Ok(DataUrl {
        mime: if mime.is_empty() {
            FALLBACK_MIME.to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}
