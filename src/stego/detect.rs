//! Decode-side method detection.
//!
//! Each carrier kind has a fixed priority order, structural methods first:
//! markers and length prefixes practically never appear in un-embedded
//! carriers, while an LSB scan can assemble garbage from natural carrier
//! noise. An attempt counts as a success only when its extraction parses AND
//! the recovered token decrypts; anything less moves on to the next method.
//!
//! Aggregation: if every attempt fails structurally the result is
//! [`StegoError::NoHiddenData`]. If at least one extraction got far enough to
//! fail authentication, that [`StegoError::Decryption`] is surfaced instead so
//! callers can prompt for a different passphrase.

use crate::crypto::{self, SymmetricError};
use crate::stego::audio::AudioStego;
use crate::stego::image::ImageStego;
use crate::stego::task::ProgressSink;
use crate::stego::text::TextStego;
use crate::stego::video::VideoStego;
use crate::stego::{
    AudioMethod, EncodingMethod, ImageMethod, StegoError, TextMethod, VideoMethod,
};

/// A successfully decoded message and the method that produced it.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub message: String,
    pub method: EncodingMethod,
}

type Attempt<'a> = (
    EncodingMethod,
    Box<dyn Fn() -> Result<String, StegoError> + 'a>,
);

/// Runs an ordered list of extraction attempts against one passphrase.
fn run_attempts(
    attempts: Vec<Attempt<'_>>,
    passphrase: &str,
) -> Result<DecodedMessage, StegoError> {
    let mut auth_failure: Option<StegoError> = None;

    for (method, extract) in attempts {
        let token = match extract() {
            Ok(token) => token,
            Err(e) => {
                log::debug!("{} extraction failed: {}", method, e);
                continue;
            }
        };

        match crypto::decrypt_message(&token, passphrase) {
            Ok(message) => return Ok(DecodedMessage { message, method }),
            Err(e @ SymmetricError::DecryptionFailed) => {
                log::debug!("{} produced a token but authentication failed", method);
                auth_failure.get_or_insert(StegoError::Decryption(e));
            }
            Err(e) => {
                // Malformed tokens come from garbage extractions, not from a
                // wrong passphrase; treat them as structural misses.
                log::debug!("{} token rejected: {}", method, e);
            }
        }
    }

    Err(auth_failure.unwrap_or(StegoError::NoHiddenData))
}

fn decode_forced(
    method: EncodingMethod,
    token: Result<String, StegoError>,
    passphrase: &str,
) -> Result<DecodedMessage, StegoError> {
    let message = crypto::decrypt_message(&token?, passphrase)?;
    Ok(DecodedMessage { message, method })
}

/// Decodes an image carrier, auto-detecting the method unless one is forced.
pub fn decode_image(
    stego: &ImageStego,
    passphrase: &str,
    method: Option<ImageMethod>,
) -> Result<DecodedMessage, StegoError> {
    if let Some(method) = method {
        let token = match method {
            ImageMethod::Chunk => stego.extract_chunk(),
            ImageMethod::Lsb => stego.extract_lsb(),
        };
        return decode_forced(EncodingMethod::Image(method), token, passphrase);
    }

    run_attempts(
        vec![
            (
                EncodingMethod::Image(ImageMethod::Chunk),
                Box::new(|| stego.extract_chunk()),
            ),
            (
                EncodingMethod::Image(ImageMethod::Lsb),
                Box::new(|| stego.extract_lsb()),
            ),
        ],
        passphrase,
    )
}

/// Decodes an audio carrier, auto-detecting the method unless one is forced.
pub fn decode_audio(
    stego: &AudioStego,
    passphrase: &str,
    method: Option<AudioMethod>,
) -> Result<DecodedMessage, StegoError> {
    if let Some(method) = method {
        let token = match method {
            AudioMethod::Chunk => stego.extract_chunk(),
            AudioMethod::Lsb => stego.extract_lsb(),
        };
        return decode_forced(EncodingMethod::Audio(method), token, passphrase);
    }

    run_attempts(
        vec![
            (
                EncodingMethod::Audio(AudioMethod::Chunk),
                Box::new(|| stego.extract_chunk()),
            ),
            (
                EncodingMethod::Audio(AudioMethod::Lsb),
                Box::new(|| stego.extract_lsb()),
            ),
        ],
        passphrase,
    )
}

/// Decodes a video carrier, auto-detecting the method unless one is forced.
///
/// EOF and metadata extraction are cheap byte scans and run first; the LSB
/// frame walk only starts when both miss.
pub fn decode_video(
    stego: &VideoStego,
    passphrase: &str,
    method: Option<VideoMethod>,
    progress: &ProgressSink,
) -> Result<DecodedMessage, StegoError> {
    if let Some(method) = method {
        let token = match method {
            VideoMethod::Eof => stego.extract_eof(),
            VideoMethod::Metadata => stego.extract_metadata(),
            VideoMethod::Lsb => stego.extract_lsb(progress),
        };
        return decode_forced(EncodingMethod::Video(method), token, passphrase);
    }

    run_attempts(
        vec![
            (
                EncodingMethod::Video(VideoMethod::Eof),
                Box::new(|| stego.extract_eof()),
            ),
            (
                EncodingMethod::Video(VideoMethod::Metadata),
                Box::new(|| stego.extract_metadata()),
            ),
            (
                EncodingMethod::Video(VideoMethod::Lsb),
                Box::new(|| stego.extract_lsb(progress)),
            ),
        ],
        passphrase,
    )
}

/// Decodes a text carrier, auto-detecting the method unless one is forced.
pub fn decode_text(
    stego: &TextStego,
    passphrase: &str,
    method: Option<TextMethod>,
) -> Result<DecodedMessage, StegoError> {
    if let Some(method) = method {
        let token = match method {
            TextMethod::ZeroWidth => stego.extract_zero_width(),
            TextMethod::Whitespace => stego.extract_whitespace(),
        };
        return decode_forced(EncodingMethod::Text(method), token, passphrase);
    }

    run_attempts(
        vec![
            (
                EncodingMethod::Text(TextMethod::ZeroWidth),
                Box::new(|| stego.extract_zero_width()),
            ),
            (
                EncodingMethod::Text(TextMethod::Whitespace),
                Box::new(|| stego.extract_whitespace()),
            ),
        ],
        passphrase,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stego::audio::encode_audio;
    use crate::stego::image::encode_image;
    use crate::stego::text::encode_text;
    use hound::{SampleFormat, WavSpec};
    use image::{DynamicImage, ImageBuffer, Rgb};

    fn test_image() -> ImageStego {
        let img = ImageBuffer::from_fn(60, 60, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        ImageStego::from_image(DynamicImage::ImageRgb8(img))
    }

    fn test_audio() -> AudioStego {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let samples: Vec<i16> = (0..20000).map(|i| ((i % 64) * 100) as i16).collect();
        AudioStego::from_samples(spec, samples)
    }

    fn test_text() -> TextStego {
        let carrier: Vec<String> = (0..400)
            .map(|i| format!("carrier line {} with some plain prose", i))
            .collect();
        TextStego::from_text(carrier.join("\n"))
    }

    #[test]
    fn test_image_auto_detect_reports_method() {
        let stego = test_image();

        for method in [ImageMethod::Lsb, ImageMethod::Chunk] {
            let bytes = encode_image(&stego, method, "secret", "pw").unwrap();
            let loaded = ImageStego::from_bytes(&bytes).unwrap();

            let decoded = decode_image(&loaded, "pw", None).unwrap();
            assert_eq!(decoded.message, "secret");
            assert_eq!(decoded.method, EncodingMethod::Image(method));
        }
    }

    #[test]
    fn test_audio_auto_detect_reports_method() {
        let stego = test_audio();

        for method in [AudioMethod::Lsb, AudioMethod::Chunk] {
            let bytes = encode_audio(&stego, method, "secret", "pw").unwrap();
            let loaded = AudioStego::from_bytes(&bytes).unwrap();

            let decoded = decode_audio(&loaded, "pw", None).unwrap();
            assert_eq!(decoded.message, "secret");
            assert_eq!(decoded.method, EncodingMethod::Audio(method));
        }
    }

    #[test]
    fn test_video_auto_detect_reports_method() {
        let raw: Vec<u8> = (0..4096).map(|i| (i % 240) as u8).collect();
        let stego = VideoStego::from_bytes(raw);

        for method in [VideoMethod::Eof, VideoMethod::Metadata] {
            let token = crypto::encrypt_message("secret", "pw").unwrap();
            let bytes = match method {
                VideoMethod::Eof => stego.hide_eof(&token).unwrap(),
                VideoMethod::Metadata => stego.hide_metadata(&token).unwrap(),
                VideoMethod::Lsb => unreachable!(),
            };
            let loaded = VideoStego::from_bytes(bytes);

            let decoded =
                decode_video(&loaded, "pw", None, &ProgressSink::noop()).unwrap();
            assert_eq!(decoded.message, "secret");
            assert_eq!(decoded.method, EncodingMethod::Video(method));
        }
    }

    #[test]
    fn test_text_auto_detect_reports_method() {
        let stego = test_text();

        for method in [TextMethod::Whitespace, TextMethod::ZeroWidth] {
            let encoded = encode_text(&stego, method, "secret", "pw").unwrap();
            let loaded = TextStego::from_text(encoded);

            let decoded = decode_text(&loaded, "pw", None).unwrap();
            assert_eq!(decoded.message, "secret");
            assert_eq!(decoded.method, EncodingMethod::Text(method));
        }
    }

    #[test]
    fn test_wrong_passphrase_surfaces_decryption_error() {
        let stego = test_image();
        let bytes = encode_image(&stego, ImageMethod::Chunk, "secret", "right").unwrap();
        let loaded = ImageStego::from_bytes(&bytes).unwrap();

        let result = decode_image(&loaded, "wrong", None);
        assert!(matches!(result, Err(StegoError::Decryption(_))));
    }

    #[test]
    fn test_untouched_carrier_reports_no_hidden_data() {
        let result = decode_image(&test_image(), "pw", None);
        assert!(matches!(result, Err(StegoError::NoHiddenData)));

        let result = decode_text(&test_text(), "pw", None);
        assert!(matches!(result, Err(StegoError::NoHiddenData)));
    }

    #[test]
    fn test_forced_method_skips_detection() {
        let stego = test_audio();
        let bytes = encode_audio(&stego, AudioMethod::Chunk, "secret", "pw").unwrap();
        let loaded = AudioStego::from_bytes(&bytes).unwrap();

        // Forcing LSB on a chunk-encoded carrier must not fall back.
        let result = decode_audio(&loaded, "pw", Some(AudioMethod::Lsb));
        assert!(result.is_err());

        let decoded = decode_audio(&loaded, "pw", Some(AudioMethod::Chunk)).unwrap();
        assert_eq!(decoded.message, "secret");
    }
}
