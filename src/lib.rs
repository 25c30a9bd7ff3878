//! # Polyhide - Hide encrypted messages in everyday files
//!
//! Polyhide embeds a passphrase-encrypted message inside a carrier file so
//! that the carrier stays usable: images still render, audio still plays,
//! video still plays, text still reads. Given the same passphrase, the
//! message is recovered later, and decoding auto-detects which embedding
//! method was used.
//!
//! ## Carriers and methods
//!
//! | Carrier | Methods |
//! |---------|---------|
//! | Image (PNG, BMP) | pixel LSB, PNG text chunk |
//! | Audio (WAV) | sample LSB, trailer chunk |
//! | Video | frame LSB, metadata injection, EOF injection |
//! | Text | trailing whitespace, zero-width characters |
//!
//! ## Security model
//!
//! - Messages are encrypted with ChaCha20-Poly1305 under a key derived from
//!   the passphrase (HKDF-SHA256); a wrong passphrase is a deterministic
//!   authentication failure, never silently wrong plaintext.
//! - The carrier is never modified in place: encoding produces a new output.
//! - Steganalysis resistance is NOT a goal; the hiding is casual, the
//!   confidentiality comes from the cipher.
//!
//! ## Example
//!
//! ```rust
//! use polyhide::{decode_image, encode_image, ImageMethod, ImageStego};
//!
//! let carrier = image::DynamicImage::new_rgb8(64, 64);
//! let stego = ImageStego::from_image(carrier);
//!
//! let encoded = encode_image(&stego, ImageMethod::Lsb, "meet at dawn", "hunter2").unwrap();
//!
//! let loaded = ImageStego::from_bytes(&encoded).unwrap();
//! let decoded = decode_image(&loaded, "hunter2", None).unwrap();
//! assert_eq!(decoded.message, "meet at dawn");
//! ```
//!
//! ## Modules
//!
//! - [`crypto`]: key derivation and the payload cipher
//! - [`stego`]: per-carrier codecs, auto-detection, background tasks

pub mod crypto;
pub mod stego;

// Re-export commonly used types at the crate root
pub use crypto::SymmetricError;
pub use stego::{
    decode_audio, decode_image, decode_text, decode_video, encode_audio, encode_image,
    encode_text, encode_video, AudioMethod, AudioStego, CarrierKind, DecodedMessage,
    EncodingMethod, FrameProgress, ImageMethod, ImageStego, ProgressSink, StegoError,
    TaskHandle, TextMethod, TextStego, VideoMethod, VideoStego, INJECTION_CAPACITY,
};
pub use stego::task::spawn;
