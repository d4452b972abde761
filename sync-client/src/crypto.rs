//! Cryptographic primitives for ClipSync.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation (100,000 rounds, fixed salt)
//! - AES-256-GCM encryption with random 96-bit nonces
//! - Base64 packing of ciphertext and nonce for the JSON envelope
//!
//! # Security Notes
//!
//! - The salt is fixed, so identical secrets yield identical keys on every
//!   deployment. Browsers running the web build derive the same key, which
//!   is what makes mixed clients interoperate.
//! - Nonces are random per message. The 2^32 birthday bound is far beyond
//!   clipboard traffic volumes.
//! - Key material is zeroized on drop.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Nonce size for AES-GCM (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// PBKDF2 round count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt shared by every ClipSync deployment.
pub const KDF_SALT: &[u8] = b"clipsync-salt-v2";

/// Shown in place of ciphertext when no secret is configured.
pub const ENCRYPTED_PLACEHOLDER: &str = "🔒 Encrypted Content (Set Secret Key in Settings)";

/// Shown in place of ciphertext that failed to decrypt.
pub const DECRYPTION_FAILED_PLACEHOLDER: &str = "❌ Decryption Failed (Wrong Key)";

/// Crypto errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong key, corrupt data or bad encoding).
    #[error("decryption failed: authentication error")]
    DecryptionFailed,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),
}

/// A 256-bit AES key derived from a shared secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Derive a key from a password with PBKDF2-HMAC-SHA256.
    ///
    /// This is deliberately slow; async callers should run it on the
    /// blocking pool.
    pub fn derive(password: &str) -> Result<Self, CryptoError> {
        if password.is_empty() {
            return Err(CryptoError::KeyDerivationFailed("empty secret".into()));
        }

        let mut key = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), KDF_SALT, PBKDF2_ITERATIONS, &mut key);
        Ok(Self(key))
    }

    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt UTF-8 text with AES-256-GCM under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<Sealed, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed("aead encrypt failed".into()))?;

        Ok(Sealed {
            payload: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce_bytes),
        })
    }

    /// Decrypt a base64 payload and nonce back into text.
    ///
    /// Every failure (bad base64, wrong nonce length, authentication
    /// failure, non-UTF-8 plaintext) is [`CryptoError::DecryptionFailed`].
    pub fn decrypt(&self, payload: &str, iv: &str) -> Result<String, CryptoError> {
        let ciphertext = STANDARD
            .decode(payload)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let nonce_bytes = STANDARD
            .decode(iv)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher =
            Aes256Gcm::new_from_slice(&self.0).map_err(|_| CryptoError::DecryptionFailed)?;

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}

// Don't leak keys in debug output
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// Ciphertext and nonce, both standard base64, ready for the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// base64(ciphertext ‖ tag)
    pub payload: String,
    /// base64(nonce)
    pub iv: String,
}

/// Derive a key from `password` and encrypt `plaintext`.
pub fn encrypt(plaintext: &str, password: &str) -> Result<Sealed, CryptoError> {
    SecretKey::derive(password)?.encrypt(plaintext)
}

/// Derive a key from `password` and decrypt.
pub fn decrypt(payload: &str, iv: &str, password: &str) -> Result<String, CryptoError> {
    SecretKey::derive(password)?.decrypt(payload, iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SecretKey {
        SecretKey::from_bytes([7u8; KEY_SIZE])
    }

    // ===========================================
    // Key Derivation Tests
    // ===========================================

    #[test]
    fn derivation_is_deterministic() {
        let a = SecretKey::derive("correct horse").unwrap();
        let b = SecretKey::derive("correct horse").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_passwords_give_different_keys() {
        let a = SecretKey::derive("secret-1").unwrap();
        let b = SecretKey::derive("secret-2").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn derivation_matches_pbkdf2_parameters() {
        let mut expected = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(b"x", b"clipsync-salt-v2", 100_000, &mut expected);
        assert_eq!(SecretKey::derive("x").unwrap().as_bytes(), &expected);
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(matches!(
            SecretKey::derive(""),
            Err(CryptoError::KeyDerivationFailed(_))
        ));
    }

    // ===========================================
    // AES-GCM Tests
    // ===========================================

    #[test]
    fn password_roundtrip() {
        let sealed = encrypt("hello from the laptop", "x").unwrap();
        assert_eq!(
            decrypt(&sealed.payload, &sealed.iv, "x").unwrap(),
            "hello from the laptop"
        );
    }

    #[test]
    fn uses_96_bit_nonces() {
        let sealed = test_key().encrypt("hi").unwrap();
        assert_eq!(STANDARD.decode(&sealed.iv).unwrap().len(), NONCE_SIZE);
        // 2 bytes plaintext + 16 bytes tag
        assert_eq!(STANDARD.decode(&sealed.payload).unwrap().len(), 2 + 16);
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let key = test_key();
        let s1 = key.encrypt("Same message").unwrap();
        let s2 = key.encrypt("Same message").unwrap();

        assert_ne!(s1.iv, s2.iv);
        assert_ne!(s1.payload, s2.payload);
        assert_eq!(key.decrypt(&s1.payload, &s1.iv).unwrap(), "Same message");
        assert_eq!(key.decrypt(&s2.payload, &s2.iv).unwrap(), "Same message");
    }

    #[test]
    fn wrong_password_fails_decryption() {
        let sealed = encrypt("Secret message", "p1").unwrap();
        let result = decrypt(&sealed.payload, &sealed.iv, "p2");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn corrupted_ciphertext_fails_decryption() {
        let key = test_key();
        let sealed = key.encrypt("Secret message").unwrap();

        let mut bytes = STANDARD.decode(&sealed.payload).unwrap();
        bytes[0] ^= 0xFF;
        let corrupted = STANDARD.encode(bytes);

        assert!(matches!(
            key.decrypt(&corrupted, &sealed.iv),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn malformed_inputs_fail_decryption() {
        let key = test_key();
        let sealed = key.encrypt("x").unwrap();

        assert!(key.decrypt("not base64!", &sealed.iv).is_err());
        assert!(key.decrypt(&sealed.payload, "not base64!").is_err());
        // Valid base64, wrong nonce length
        assert!(key.decrypt(&sealed.payload, "AAAA").is_err());
    }

    #[test]
    fn empty_plaintext_encrypts() {
        let key = test_key();
        let sealed = key.encrypt("").unwrap();
        assert_eq!(key.decrypt(&sealed.payload, &sealed.iv).unwrap(), "");
    }

    #[test]
    fn large_plaintext_encrypts() {
        let key = test_key();
        let plaintext = "B".repeat(1024 * 1024);
        let sealed = key.encrypt(&plaintext).unwrap();
        assert_eq!(key.decrypt(&sealed.payload, &sealed.iv).unwrap(), plaintext);
    }

    #[test]
    fn unicode_roundtrip() {
        let key = test_key();
        let sealed = key.encrypt("📋 naïve 剪贴板").unwrap();
        assert_eq!(
            key.decrypt(&sealed.payload, &sealed.iv).unwrap(),
            "📋 naïve 剪贴板"
        );
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let key = SecretKey::from_bytes([0xAB; KEY_SIZE]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("171"));
    }
}
