//! Cryptographic operations for Polyhide.
//!
//! This module provides:
//! - Key derivation from passphrase (HKDF-SHA256)
//! - Authenticated symmetric encryption (ChaCha20-Poly1305)
//!
//! All carriers share the same payload cipher: codecs embed and extract the
//! ASCII token produced here, and never touch key material themselves.

pub mod symmetric;

pub use symmetric::{
    decrypt_message, derive_key, encrypt_message, max_message_len, token_len, SymmetricError,
};
