//! Steganography for images (PNG, BMP).
//!
//! Two methods:
//! - **LSB**: one message bit in the least significant bit of each RGB
//!   channel, raster order, terminated by the bitstream end marker.
//! - **Chunk**: the token travels in a PNG `tEXt` chunk keyed `StegoData`;
//!   pixel values are untouched, so the rendered image is identical.

use std::io::Cursor;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::stego::bitstream::{marked_bits, BitCollector, MARKER_BITS};
use crate::stego::{ImageMethod, StegoError, INJECTION_CAPACITY};

/// Keyword of the PNG text chunk used by the chunk method.
const TEXT_CHUNK_KEYWORD: &str = "StegoData";

/// Prefix of the text chunk value, ahead of the JSON envelope.
const METADATA_PREFIX: &str = "STEGO_METADATA:";

/// JSON envelope stored in the PNG text chunk.
#[derive(Serialize, Deserialize)]
struct ChunkEnvelope {
    stego: String,
    method: String,
    timestamp: u64,
    message_length: usize,
    encrypted_message: String,
}

/// Image steganography handler.
pub struct ImageStego {
    image: DynamicImage,
    /// Original container bytes, kept for chunk extraction.
    raw: Option<Vec<u8>>,
}

impl ImageStego {
    /// Creates a new ImageStego from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StegoError> {
        let raw = std::fs::read(path)?;
        Self::from_bytes(&raw)
    }

    /// Creates a new ImageStego from encoded container bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| StegoError::ImageLoad(e.to_string()))?;
        Ok(Self {
            image,
            raw: Some(bytes.to_vec()),
        })
    }

    /// Creates a new ImageStego from an already decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        Self { image, raw: None }
    }

    /// Returns the LSB payload capacity in bytes.
    pub fn lsb_capacity(&self) -> usize {
        let (width, height) = self.image.dimensions();
        let total_bits = (width as usize) * (height as usize) * 3;
        total_bits.saturating_sub(MARKER_BITS) / 8
    }

    /// Returns the largest message length (bytes) embeddable with LSB.
    pub fn lsb_message_capacity(&self) -> usize {
        crypto::max_message_len(self.lsb_capacity())
    }

    /// Hides a payload token in the pixel LSBs, returning a new image.
    ///
    /// Channels are visited R, G, B per pixel in raster order; pixels after
    /// the end marker are copied unchanged.
    pub fn hide_lsb(&self, token: &str) -> Result<DynamicImage, StegoError> {
        let payload = token.as_bytes();
        let capacity = self.lsb_capacity();
        if payload.len() > capacity {
            return Err(StegoError::CapacityExceeded {
                needed: payload.len(),
                capacity,
            });
        }

        let mut rgb = self.image.to_rgb8();
        let mut bits = marked_bits(payload);

        'outer: for pixel in rgb.pixels_mut() {
            for channel in 0..3 {
                match bits.next() {
                    Some(bit) => pixel.0[channel] = (pixel.0[channel] & 0xFE) | bit,
                    None => break 'outer,
                }
            }
        }

        Ok(DynamicImage::ImageRgb8(rgb))
    }

    /// Extracts a payload token from the pixel LSBs.
    pub fn extract_lsb(&self) -> Result<String, StegoError> {
        let rgb = self.image.to_rgb8();
        let mut collector = BitCollector::new();

        'outer: for pixel in rgb.pixels() {
            for channel in 0..3 {
                if collector.push(pixel.0[channel] & 1) {
                    break 'outer;
                }
            }
        }

        let payload = collector.into_payload().ok_or(StegoError::NoHiddenData)?;
        String::from_utf8(payload).map_err(|_| StegoError::NoHiddenData)
    }

    /// Hides a payload token in a PNG text chunk, returning PNG bytes.
    ///
    /// `message_len` is the plaintext length recorded in the envelope.
    pub fn hide_chunk(&self, token: &str, message_len: usize) -> Result<Vec<u8>, StegoError> {
        if token.len() > INJECTION_CAPACITY {
            return Err(StegoError::CapacityExceeded {
                needed: token.len(),
                capacity: INJECTION_CAPACITY,
            });
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let envelope = ChunkEnvelope {
            stego: "true".to_string(),
            method: "metadata_chunk".to_string(),
            timestamp,
            message_length: message_len,
            encrypted_message: token.to_string(),
        };
        let value = format!(
            "{}{}",
            METADATA_PREFIX,
            serde_json::to_string(&envelope)
                .map_err(|e| StegoError::ImageSave(e.to_string()))?
        );

        let rgb = self.image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder
                .add_text_chunk(TEXT_CHUNK_KEYWORD.to_string(), value)
                .map_err(|e| StegoError::ImageSave(e.to_string()))?;
            let mut writer = encoder
                .write_header()
                .map_err(|e| StegoError::ImageSave(e.to_string()))?;
            writer
                .write_image_data(rgb.as_raw())
                .map_err(|e| StegoError::ImageSave(e.to_string()))?;
        }

        Ok(out)
    }

    /// Extracts a payload token from the PNG text chunks.
    pub fn extract_chunk(&self) -> Result<String, StegoError> {
        let raw = match &self.raw {
            Some(raw) => raw,
            None => return Err(StegoError::NoHiddenData),
        };

        let decoder = png::Decoder::new(Cursor::new(raw));
        let mut reader = decoder.read_info().map_err(|_| StegoError::NoHiddenData)?;

        // Drain the image so text chunks after IDAT are parsed as well.
        let mut buf = vec![0; reader.output_buffer_size()];
        let _ = reader.next_frame(&mut buf);
        let _ = reader.finish();

        for chunk in &reader.info().uncompressed_latin1_text {
            if chunk.keyword != TEXT_CHUNK_KEYWORD && !chunk.text.contains(METADATA_PREFIX) {
                continue;
            }
            if let Some(json) = chunk.text.split(METADATA_PREFIX).nth(1) {
                if let Ok(envelope) = serde_json::from_str::<ChunkEnvelope>(json) {
                    if envelope.stego == "true" {
                        return Ok(envelope.encrypted_message);
                    }
                }
            }
        }

        Err(StegoError::NoHiddenData)
    }

    /// Returns the image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, StegoError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| StegoError::ImageSave(e.to_string()))?;
        Ok(bytes)
    }

    /// Returns a reference to the underlying image.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Encrypts `message` and embeds it in the carrier image, returning PNG bytes.
pub fn encode_image(
    stego: &ImageStego,
    method: ImageMethod,
    message: &str,
    passphrase: &str,
) -> Result<Vec<u8>, StegoError> {
    let token = crypto::encrypt_message(message, passphrase)?;

    match method {
        ImageMethod::Lsb => {
            let encoded = stego.hide_lsb(&token)?;
            ImageStego::from_image(encoded).to_png_bytes()
        }
        ImageMethod::Chunk => stego.hide_chunk(&token, message.chars().count()),
    }
}
