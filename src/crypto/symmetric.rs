//! Symmetric encryption with passphrase for Polyhide.
//!
//! This module provides passphrase-based symmetric encryption using:
//! - HKDF-SHA256 for key derivation from passphrase
//! - ChaCha20-Poly1305 for authenticated encryption
//!
//! The output is a self-contained token: URL-safe base64 of
//! `nonce (12 bytes) || ciphertext || auth tag (16 bytes)`. Tokens are plain
//! ASCII so they can be embedded in text carriers without escaping.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use thiserror::Error;

/// HKDF info string for passphrase-based key derivation.
const HKDF_INFO: &[u8] = b"POLYHIDE-V1-SYMMETRIC";

/// Salt for HKDF (fixed for deterministic behavior with same passphrase).
const HKDF_SALT: &[u8] = b"POLYHIDE-V1-SALT";

/// Nonce size for ChaCha20Poly1305.
const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size.
const TAG_SIZE: usize = 16;

/// Errors that can occur during symmetric encryption.
#[derive(Error, Debug)]
pub enum SymmetricError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed (wrong passphrase or corrupted data)")]
    DecryptionFailed,

    #[error("Malformed token: not valid base64 or UTF-8")]
    MalformedToken,

    #[error("Token too short")]
    TokenTooShort,

    #[error("Key derivation failed")]
    KeyDerivationFailed,
}

/// Derives a 256-bit symmetric key from a passphrase.
///
/// Deterministic: the same passphrase always yields the same key. There is no
/// per-message salt; uniqueness of ciphertexts comes from the random nonce.
pub fn derive_key(passphrase: &str) -> Result<[u8; 32], SymmetricError> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), passphrase.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|_| SymmetricError::KeyDerivationFailed)?;
    Ok(key)
}

/// Encrypts a message using a passphrase, returning an ASCII token.
pub fn encrypt_message(plaintext: &str, passphrase: &str) -> Result<String, SymmetricError> {
    let key = derive_key(passphrase)?;

    // Fresh random nonce per call
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| SymmetricError::EncryptionFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| SymmetricError::EncryptionFailed(e.to_string()))?;

    let mut raw = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    raw.extend_from_slice(&nonce_bytes);
    raw.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&raw))
}

/// Decrypts a token produced by [`encrypt_message`].
///
/// Fails with [`SymmetricError::DecryptionFailed`] when the authentication tag
/// does not verify (wrong passphrase or tampered data), and with
/// [`SymmetricError::MalformedToken`] / [`SymmetricError::TokenTooShort`] when
/// the token is not structurally valid.
pub fn decrypt_message(token: &str, passphrase: &str) -> Result<String, SymmetricError> {
    let raw = BASE64
        .decode(token)
        .map_err(|_| SymmetricError::MalformedToken)?;

    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SymmetricError::TokenTooShort);
    }

    let nonce = Nonce::from_slice(&raw[..NONCE_SIZE]);
    let ciphertext = &raw[NONCE_SIZE..];

    let key = derive_key(passphrase)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|_| SymmetricError::DecryptionFailed)?;

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SymmetricError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| SymmetricError::MalformedToken)
}

/// Returns the token length in bytes for a message of `message_len` UTF-8 bytes.
pub fn token_len(message_len: usize) -> usize {
    // Unpadded base64: ceil(4n / 3)
    let raw = NONCE_SIZE + message_len + TAG_SIZE;
    (raw * 4 + 2) / 3
}

/// Returns the largest message length (in UTF-8 bytes) whose token fits in
/// `payload_capacity` embeddable bytes.
pub fn max_message_len(payload_capacity: usize) -> usize {
    if token_len(0) > payload_capacity {
        return 0;
    }
    // token_len is monotonic, so a rough inverse plus a short walk is exact.
    let mut len = (payload_capacity * 3 / 4).saturating_sub(NONCE_SIZE + TAG_SIZE);
    while token_len(len + 1) <= payload_capacity {
        len += 1;
    }
    while len > 0 && token_len(len) > payload_capacity {
        len -= 1;
    }
    len
}
