//! Steganography for WAV audio.
//!
//! Two methods:
//! - **LSB**: one message bit in the least significant bit of each PCM
//!   sample, across all channels' interleaved samples in file order.
//! - **Chunk**: `"steg" + u32le(len) + token` appended after the RIFF
//!   structure; the audio data is untouched and players ignore the trailer.
//!
//! Only integer PCM with 8 or 16 bits per sample is supported.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::crypto;
use crate::stego::bitstream::{marked_bits, BitCollector, MARKER_BITS};
use crate::stego::{rfind_tag, AudioMethod, StegoError, INJECTION_CAPACITY};

/// Identifier of the appended trailer chunk.
const CHUNK_TAG: &[u8; 4] = b"steg";

/// Audio steganography handler.
pub struct AudioStego {
    /// Audio specification (sample rate, channels, bit depth).
    spec: WavSpec,
    /// Interleaved samples, widened to i16 for 8-bit files.
    samples: Vec<i16>,
    /// Original container bytes, kept for chunk operations.
    raw: Option<Vec<u8>>,
}

impl AudioStego {
    /// Creates a new AudioStego from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StegoError> {
        let raw = std::fs::read(path)?;
        Self::from_bytes(&raw)
    }

    /// Creates a new AudioStego from WAV bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| StegoError::AudioLoad(e.to_string()))?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int
            || !matches!(spec.bits_per_sample, 8 | 16)
        {
            return Err(StegoError::UnsupportedFormat(format!(
                "only 8/16-bit integer PCM WAV is supported, got {} bits {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StegoError::AudioLoad(e.to_string()))?;

        Ok(Self {
            spec,
            samples,
            raw: Some(bytes.to_vec()),
        })
    }

    /// Creates an AudioStego from raw samples.
    pub fn from_samples(spec: WavSpec, samples: Vec<i16>) -> Self {
        Self {
            spec,
            samples,
            raw: None,
        }
    }

    /// Returns the LSB payload capacity in bytes (1 bit per sample).
    pub fn lsb_capacity(&self) -> usize {
        self.samples.len().saturating_sub(MARKER_BITS) / 8
    }

    /// Returns the largest message length (bytes) embeddable with LSB.
    pub fn lsb_message_capacity(&self) -> usize {
        crypto::max_message_len(self.lsb_capacity())
    }

    /// Returns the number of samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Returns the audio specification.
    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// Hides a payload token in the sample LSBs, returning a new AudioStego.
    pub fn hide_lsb(&self, token: &str) -> Result<Self, StegoError> {
        let payload = token.as_bytes();
        let capacity = self.lsb_capacity();
        if payload.len() > capacity {
            return Err(StegoError::CapacityExceeded {
                needed: payload.len(),
                capacity,
            });
        }

        let mut samples = self.samples.clone();
        for (sample, bit) in samples.iter_mut().zip(marked_bits(payload)) {
            *sample = (*sample & !1) | bit as i16;
        }

        // Samples changed, so any stored container bytes are stale.
        Ok(Self {
            spec: self.spec,
            samples,
            raw: None,
        })
    }

    /// Extracts a payload token from the sample LSBs.
    pub fn extract_lsb(&self) -> Result<String, StegoError> {
        let mut collector = BitCollector::new();
        for sample in &self.samples {
            if collector.push((sample & 1) as u8) {
                break;
            }
        }

        let payload = collector.into_payload().ok_or(StegoError::NoHiddenData)?;
        String::from_utf8(payload).map_err(|_| StegoError::NoHiddenData)
    }

    /// Hides a payload token in a trailer chunk, returning the full file bytes.
    pub fn hide_chunk(&self, token: &str) -> Result<Vec<u8>, StegoError> {
        if token.len() > INJECTION_CAPACITY {
            return Err(StegoError::CapacityExceeded {
                needed: token.len(),
                capacity: INJECTION_CAPACITY,
            });
        }

        let mut out = self.container_bytes()?;
        out.extend_from_slice(CHUNK_TAG);
        out.extend_from_slice(&(token.len() as u32).to_le_bytes());
        out.extend_from_slice(token.as_bytes());
        Ok(out)
    }

    /// Extracts a payload token from the trailer chunk.
    ///
    /// Searches for the last occurrence of the tag so that audio data which
    /// happens to contain the tag bytes does not shadow the real trailer.
    pub fn extract_chunk(&self) -> Result<String, StegoError> {
        let raw = match &self.raw {
            Some(raw) => raw,
            None => return Err(StegoError::NoHiddenData),
        };

        let index = rfind_tag(raw, CHUNK_TAG).ok_or(StegoError::NoHiddenData)?;
        let len_start = index + CHUNK_TAG.len();
        if len_start + 4 > raw.len() {
            return Err(StegoError::NoHiddenData);
        }

        let len_bytes: [u8; 4] = raw[len_start..len_start + 4]
            .try_into()
            .map_err(|_| StegoError::NoHiddenData)?;
        let payload_len = u32::from_le_bytes(len_bytes) as usize;

        let payload_start = len_start + 4;
        let available = raw.len() - payload_start;
        if payload_len > available {
            return Err(StegoError::TruncatedData {
                expected: payload_len,
                available,
            });
        }

        let payload = &raw[payload_start..payload_start + payload_len];
        String::from_utf8(payload.to_vec()).map_err(|_| StegoError::NoHiddenData)
    }

    /// Returns the audio as WAV bytes.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, StegoError> {
        let mut bytes = Vec::new();
        {
            let cursor = Cursor::new(&mut bytes);
            let mut writer = WavWriter::new(cursor, self.spec)
                .map_err(|e| StegoError::AudioSave(e.to_string()))?;

            for sample in &self.samples {
                writer
                    .write_sample(*sample)
                    .map_err(|e| StegoError::AudioSave(e.to_string()))?;
            }

            writer
                .finalize()
                .map_err(|e| StegoError::AudioSave(e.to_string()))?;
        }
        Ok(bytes)
    }

    /// Container bytes as read from disk, or freshly encoded WAV bytes.
    fn container_bytes(&self) -> Result<Vec<u8>, StegoError> {
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => self.to_wav_bytes(),
        }
    }
}

/// Encrypts `message` and embeds it in the carrier audio, returning WAV bytes.
pub fn encode_audio(
    stego: &AudioStego,
    method: AudioMethod,
    message: &str,
    passphrase: &str,
) -> Result<Vec<u8>, StegoError> {
    let token = crypto::encrypt_message(message, passphrase)?;

    match method {
        AudioMethod::Lsb => stego.hide_lsb(&token)?.to_wav_bytes(),
        AudioMethod::Chunk => stego.hide_chunk(&token),
    }
}

#[cfg(test)]
fn create_test_audio(sample_count: usize) -> AudioStego {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // A simple sine wave carrier
    let samples: Vec<i16> = (0..sample_count)
        .map(|i| {
            let t = i as f64 / 44100.0;
            (f64::sin(2.0 * std::f64::consts::PI * 440.0 * t) * 16000.0) as i16
        })
        .collect();

    AudioStego::from_samples(spec, samples)
}
