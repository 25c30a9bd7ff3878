//! Steganography module for hiding encrypted messages in various carriers.
//!
//! Supports:
//! - Image LSB and PNG text-chunk injection (PNG, BMP)
//! - Audio LSB and trailer-chunk injection (WAV)
//! - Video LSB, metadata injection, and EOF injection
//! - Text trailing-whitespace and zero-width character embedding
//!
//! Each codec embeds the ASCII token produced by [`crate::crypto`]; decoding
//! reverses the embedding and hands the token back to the cipher. The
//! [`detect`] module tries a carrier's methods in a fixed priority order when
//! no method is forced.

pub mod audio;
pub mod bitstream;
pub mod detect;
pub mod image;
pub mod task;
pub mod text;
pub mod video;

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::crypto::SymmetricError;

pub use audio::{encode_audio, AudioStego};
pub use detect::{decode_audio, decode_image, decode_text, decode_video, DecodedMessage};
pub use image::{encode_image, ImageStego};
pub use task::{FrameProgress, ProgressSink, TaskHandle};
pub use text::{encode_text, TextStego};
pub use video::{encode_video, VideoStego};

/// Advisory payload limit for injection methods (chunk/metadata/EOF).
///
/// These methods grow the file instead of consuming carrier capacity, so the
/// only bound is practical file-size growth.
pub const INJECTION_CAPACITY: usize = 16 * 1024 * 1024;

/// Errors that can occur during steganographic encoding or decoding.
#[derive(Error, Debug)]
pub enum StegoError {
    /// Payload too long for the chosen carrier and method.
    /// Raised before any carrier byte is modified.
    #[error("Message too long for carrier: need {needed} bytes, capacity is {capacity}")]
    CapacityExceeded {
        /// Payload bytes that would have to be embedded.
        needed: usize,
        /// Payload bytes the carrier can hold with this method.
        capacity: usize,
    },

    /// Carrier cannot be used with this codec (wrong sample width,
    /// unreadable container, and so on).
    #[error("Unsupported carrier format: {0}")]
    UnsupportedFormat(String),

    /// No structural marker or length prefix was found in the carrier.
    #[error("No hidden data found in carrier")]
    NoHiddenData,

    /// The embedded token was recovered but could not be decrypted.
    /// Distinguished from [`StegoError::NoHiddenData`] so callers can prompt
    /// for a different passphrase.
    #[error(transparent)]
    Decryption(#[from] SymmetricError),

    /// A length prefix claims more bytes than the carrier holds.
    #[error("Truncated payload: length prefix claims {expected} bytes, only {available} present")]
    TruncatedData {
        /// Bytes the length prefix claims.
        expected: usize,
        /// Bytes actually available after the prefix.
        available: usize,
    },

    #[error("Image load error: {0}")]
    ImageLoad(String),

    #[error("Image save error: {0}")]
    ImageSave(String),

    #[error("Audio load error: {0}")]
    AudioLoad(String),

    #[error("Audio save error: {0}")]
    AudioSave(String),

    /// Video pipeline failure (ffmpeg/ffprobe unavailable or exited nonzero).
    #[error("Video processing error: {0}")]
    Video(String),

    /// A background task was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Embedding methods for image carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMethod {
    /// One bit per RGB channel in raster order.
    Lsb,
    /// PNG `tEXt` chunk; pixel data untouched.
    Chunk,
}

/// Embedding methods for audio carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMethod {
    /// One bit per PCM sample.
    Lsb,
    /// Custom chunk appended after the RIFF structure.
    Chunk,
}

/// Embedding methods for video carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMethod {
    /// One bit per RGB channel per pixel, frames consumed in decode order.
    Lsb,
    /// JSON envelope inserted near the end of the container bytes.
    Metadata,
    /// Payload appended strictly after all container bytes.
    Eof,
}

/// Embedding methods for text carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMethod {
    /// Trailing space (0) or tab (1) per line.
    Whitespace,
    /// U+200B (0) / U+200C (1) inserted after successive characters.
    ZeroWidth,
}

impl fmt::Display for ImageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageMethod::Lsb => write!(f, "lsb"),
            ImageMethod::Chunk => write!(f, "chunk"),
        }
    }
}

impl fmt::Display for AudioMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioMethod::Lsb => write!(f, "lsb"),
            AudioMethod::Chunk => write!(f, "chunk"),
        }
    }
}

impl fmt::Display for VideoMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoMethod::Lsb => write!(f, "lsb"),
            VideoMethod::Metadata => write!(f, "metadata"),
            VideoMethod::Eof => write!(f, "eof"),
        }
    }
}

impl fmt::Display for TextMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMethod::Whitespace => write!(f, "whitespace"),
            TextMethod::ZeroWidth => write!(f, "zero-width"),
        }
    }
}

/// An embedding method together with its carrier family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMethod {
    Image(ImageMethod),
    Audio(AudioMethod),
    Video(VideoMethod),
    Text(TextMethod),
}

impl fmt::Display for EncodingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMethod::Image(m) => write!(f, "{}", m),
            EncodingMethod::Audio(m) => write!(f, "{}", m),
            EncodingMethod::Video(m) => write!(f, "{}", m),
            EncodingMethod::Text(m) => write!(f, "{}", m),
        }
    }
}

/// Carrier families supported by Polyhide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierKind {
    Image,
    Audio,
    Video,
    Text,
}

impl CarrierKind {
    /// Guesses the carrier kind from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<CarrierKind> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase();

        match ext.as_str() {
            "png" | "bmp" => Some(CarrierKind::Image),
            "wav" => Some(CarrierKind::Audio),
            "mp4" | "avi" | "mkv" | "mov" | "m4v" | "webm" => Some(CarrierKind::Video),
            "txt" | "md" | "csv" | "json" | "xml" | "html" | "log" => Some(CarrierKind::Text),
            _ => None,
        }
    }
}

/// Returns the offset of the first occurrence of `tag` in `data`.
pub(crate) fn find_tag(data: &[u8], tag: &[u8]) -> Option<usize> {
    data.windows(tag.len()).position(|w| w == tag)
}

/// Returns the offset of the last occurrence of `tag` in `data`.
pub(crate) fn rfind_tag(data: &[u8], tag: &[u8]) -> Option<usize> {
    data.windows(tag.len()).rposition(|w| w == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_kind_from_path() {
        assert_eq!(CarrierKind::from_path("photo.PNG"), Some(CarrierKind::Image));
        assert_eq!(CarrierKind::from_path("song.wav"), Some(CarrierKind::Audio));
        assert_eq!(CarrierKind::from_path("clip.mp4"), Some(CarrierKind::Video));
        assert_eq!(CarrierKind::from_path("notes.txt"), Some(CarrierKind::Text));
        assert_eq!(CarrierKind::from_path("archive.zip"), None);
        assert_eq!(CarrierKind::from_path("no_extension"), None);
    }

    #[test]
    fn test_find_tag() {
        let data = b"aaa steg bbb steg ccc";
        assert_eq!(find_tag(data, b"steg"), Some(4));
        assert_eq!(rfind_tag(data, b"steg"), Some(13));
        assert_eq!(find_tag(data, b"missing"), None);
        assert_eq!(rfind_tag(b"st", b"steg"), None);
    }
}
