//! Pairing-code generation for ClipSync.
//!
//! A pairing code groups devices on the relay and is the key-derivation
//! input for the session, so generated codes carry 80 bits of entropy.
//!
//! Format: 16 base32 characters in four dash-separated groups
//! (`XXXX-XXXX-XXXX-XXXX`). Hand-typed codes are accepted too; they only
//! need to pass [`PairingCode::parse`].

use clipsync_types::PairingCode;

/// Error type for pairing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// The OS random source failed.
    Entropy(String),
    /// The code was rejected.
    InvalidCode(String),
}

impl std::fmt::Display for PairingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairingError::Entropy(msg) => write!(f, "random source failed: {}", msg),
            PairingError::InvalidCode(msg) => write!(f, "invalid pairing code: {}", msg),
        }
    }
}

impl std::error::Error for PairingError {}

/// Generate a fresh random pairing code.
pub fn generate_pairing_code() -> Result<PairingCode, PairingError> {
    let mut bytes = [0u8; 10];
    getrandom::getrandom(&mut bytes).map_err(|e| PairingError::Entropy(e.to_string()))?;
    let encoded = base32_encode(&bytes);

    let code = format!(
        "{}-{}-{}-{}",
        &encoded[0..4],
        &encoded[4..8],
        &encoded[8..12],
        &encoded[12..16]
    );
    PairingCode::parse(&code).map_err(|e| PairingError::InvalidCode(e.to_string()))
}

/// Normalize a user-entered code.
///
/// Codes that look like generated ones (base32 with optional dashes or
/// spaces, any case) are canonicalized to `XXXX-XXXX-XXXX-XXXX`, so
/// `abcd efgh ijkl mnop` and `ABCD-EFGH-IJKL-MNOP` pair together.
/// Anything else is validated and kept verbatim.
pub fn normalize_pairing_code(raw: &str) -> Result<PairingCode, PairingError> {
    let clean: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let candidate = if clean.len() == 16 && clean.chars().all(is_base32_char) {
        format!(
            "{}-{}-{}-{}",
            &clean[0..4],
            &clean[4..8],
            &clean[8..12],
            &clean[12..16]
        )
    } else {
        raw.to_string()
    };

    PairingCode::parse(&candidate).map_err(|e| PairingError::InvalidCode(e.to_string()))
}

/// Encode bytes as base32 (RFC 4648, uppercase, no padding).
fn base32_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let mut result = String::new();
    let mut bits = 0u32;
    let mut bit_count = 0;

    for &byte in bytes {
        bits = (bits << 8) | (byte as u32);
        bit_count += 8;

        while bit_count >= 5 {
            bit_count -= 5;
            let index = ((bits >> bit_count) & 0x1F) as usize;
            result.push(ALPHABET[index] as char);
        }
    }

    if bit_count > 0 {
        let index = ((bits << (5 - bit_count)) & 0x1F) as usize;
        result.push(ALPHABET[index] as char);
    }

    result
}

/// Check if a character is valid base32.
fn is_base32_char(c: char) -> bool {
    matches!(c, 'A'..='Z' | '2'..='7')
}
