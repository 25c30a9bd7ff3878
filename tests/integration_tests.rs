//! Integration tests for Polyhide
//!
//! Covers the cross-cutting properties of the codec layer:
//! - encode/decode round-trips for every carrier and method
//! - wrong passphrase is a deterministic decryption failure
//! - capacity limits are enforced before any carrier byte changes
//! - auto-detection reports the method that was used for encoding
//! - EOF and metadata injection stay distinguishable on ambiguous input

use hound::{SampleFormat, WavSpec, WavWriter};
use image::{DynamicImage, ImageBuffer, Rgb};

use polyhide::{
    decode_audio, decode_image, decode_text, decode_video, encode_audio, encode_image,
    encode_text, AudioMethod, AudioStego, EncodingMethod, ImageMethod, ImageStego,
    ProgressSink, StegoError, TextMethod, TextStego, VideoMethod, VideoStego,
};

fn test_image(width: u32, height: u32) -> ImageStego {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 13) % 256) as u8,
            ((y * 29) % 256) as u8,
            (((x * y) + 7) % 256) as u8,
        ])
    });
    ImageStego::from_image(DynamicImage::ImageRgb8(img))
}

fn test_audio(sample_count: usize) -> AudioStego {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let samples: Vec<i16> = (0..sample_count)
        .map(|i| {
            let t = i as f64 / 44100.0;
            (f64::sin(2.0 * std::f64::consts::PI * 440.0 * t) * 16000.0) as i16
        })
        .collect();
    AudioStego::from_samples(spec, samples)
}

fn test_text(lines: usize) -> TextStego {
    let carrier: Vec<String> = (0..lines)
        .map(|i| format!("The quick brown fox jumps over lazy dog number {}.", i))
        .collect();
    TextStego::from_text(carrier.join("\n"))
}

fn test_video_bytes() -> Vec<u8> {
    (0..8192).map(|i| (i * 11 % 253) as u8).collect()
}

/// Round-trip across every image method, auto-detected.
#[test]
fn test_image_roundtrip_all_methods() {
    for method in [ImageMethod::Lsb, ImageMethod::Chunk] {
        let stego = test_image(80, 80);
        let message = "The cache is under the third floorboard.";

        let encoded = encode_image(&stego, method, message, "passphrase").unwrap();
        let loaded = ImageStego::from_bytes(&encoded).unwrap();
        let decoded = decode_image(&loaded, "passphrase", None).unwrap();

        assert_eq!(decoded.message, message);
        assert_eq!(decoded.method, EncodingMethod::Image(method));
    }
}

/// Round-trip across every audio method, auto-detected.
#[test]
fn test_audio_roundtrip_all_methods() {
    for method in [AudioMethod::Lsb, AudioMethod::Chunk] {
        let stego = test_audio(50_000);
        let message = "Rendezvous moved to 21:00.";

        let encoded = encode_audio(&stego, method, message, "passphrase").unwrap();
        let loaded = AudioStego::from_bytes(&encoded).unwrap();
        let decoded = decode_audio(&loaded, "passphrase", None).unwrap();

        assert_eq!(decoded.message, message);
        assert_eq!(decoded.method, EncodingMethod::Audio(method));
    }
}

/// Round-trip across every text method, auto-detected.
#[test]
fn test_text_roundtrip_all_methods() {
    for method in [TextMethod::Whitespace, TextMethod::ZeroWidth] {
        let stego = test_text(600);
        let message = "Burn after reading.";

        let encoded = encode_text(&stego, method, message, "passphrase").unwrap();
        let loaded = TextStego::from_text(encoded);
        let decoded = decode_text(&loaded, "passphrase", None).unwrap();

        assert_eq!(decoded.message, message);
        assert_eq!(decoded.method, EncodingMethod::Text(method));
    }
}

/// Round-trip across the byte-level video methods, auto-detected.
#[test]
fn test_video_roundtrip_injection_methods() {
    for method in [VideoMethod::Eof, VideoMethod::Metadata] {
        let stego = VideoStego::from_bytes(test_video_bytes());
        let message = "Frame twelve is a fake.";
        let token = polyhide::crypto::encrypt_message(message, "passphrase").unwrap();

        let encoded = match method {
            VideoMethod::Eof => stego.hide_eof(&token).unwrap(),
            VideoMethod::Metadata => stego.hide_metadata(&token).unwrap(),
            VideoMethod::Lsb => unreachable!(),
        };
        let loaded = VideoStego::from_bytes(encoded);
        let decoded = decode_video(&loaded, "passphrase", None, &ProgressSink::noop()).unwrap();

        assert_eq!(decoded.message, message);
        assert_eq!(decoded.method, EncodingMethod::Video(method));
    }
}

/// Wrong passphrase must fail decryption, never return different plaintext.
#[test]
fn test_wrong_passphrase_rejected_everywhere() {
    let image = test_image(60, 60);
    let encoded = encode_image(&image, ImageMethod::Lsb, "secret", "right").unwrap();
    let loaded = ImageStego::from_bytes(&encoded).unwrap();
    assert!(matches!(
        decode_image(&loaded, "wrong", None),
        Err(StegoError::Decryption(_))
    ));

    let audio = test_audio(20_000);
    let encoded = encode_audio(&audio, AudioMethod::Chunk, "secret", "right").unwrap();
    let loaded = AudioStego::from_bytes(&encoded).unwrap();
    assert!(matches!(
        decode_audio(&loaded, "wrong", None),
        Err(StegoError::Decryption(_))
    ));

    let text = test_text(600);
    let encoded = encode_text(&text, TextMethod::ZeroWidth, "secret", "right").unwrap();
    let loaded = TextStego::from_text(encoded);
    assert!(matches!(
        decode_text(&loaded, "wrong", None),
        Err(StegoError::Decryption(_))
    ));
}

/// A message of exactly the computed capacity encodes; one byte more is
/// rejected before the carrier is touched.
#[test]
fn test_capacity_boundary_image_lsb() {
    let stego = test_image(16, 16);
    let capacity = stego.lsb_message_capacity();
    assert!(capacity > 0);

    let exact = "x".repeat(capacity);
    let encoded = encode_image(&stego, ImageMethod::Lsb, &exact, "pw").unwrap();
    let decoded =
        decode_image(&ImageStego::from_bytes(&encoded).unwrap(), "pw", None).unwrap();
    assert_eq!(decoded.message, exact);

    let over = "x".repeat(capacity + 1);
    let result = encode_image(&stego, ImageMethod::Lsb, &over, "pw");
    assert!(matches!(result, Err(StegoError::CapacityExceeded { .. })));
}

/// Spec scenario: an 8-line text carrier cannot hold an encrypted "hi"
/// (16 message bits + 16 marker bits already exceed 8 line slots, and the
/// encrypted payload is far larger still).
#[test]
fn test_scenario_eight_line_carrier_rejects_hi() {
    let stego = TextStego::from_text("a\nb\nc\nd\ne\nf\ng\nh\n");
    let result = encode_text(&stego, TextMethod::Whitespace, "hi", "p@ss");

    assert!(matches!(result, Err(StegoError::CapacityExceeded { .. })));
}

/// Spec scenario: 100,000-sample mono 16-bit WAV round-trips "ok" via LSB
/// under passphrase "k1"; decoding with "k2" is a decryption failure.
#[test]
fn test_scenario_wav_lsb_ok() {
    let stego = test_audio(100_000);

    let encoded = encode_audio(&stego, AudioMethod::Lsb, "ok", "k1").unwrap();
    let loaded = AudioStego::from_bytes(&encoded).unwrap();

    let decoded = decode_audio(&loaded, "k1", None).unwrap();
    assert_eq!(decoded.message, "ok");
    assert_eq!(decoded.method, EncodingMethod::Audio(AudioMethod::Lsb));

    assert!(matches!(
        decode_audio(&loaded, "k2", None),
        Err(StegoError::Decryption(_))
    ));
}

/// A metadata-encoded video probed specifically with EOF decode must fail,
/// because the payload span does not end at true end-of-file.
#[test]
fn test_eof_metadata_disambiguation() {
    let stego = VideoStego::from_bytes(test_video_bytes());
    let token = polyhide::crypto::encrypt_message("hidden", "pw").unwrap();

    let encoded = VideoStego::from_bytes(stego.hide_metadata(&token).unwrap());
    let result = encoded.extract_eof();

    assert!(matches!(
        result,
        Err(StegoError::NoHiddenData) | Err(StegoError::TruncatedData { .. })
    ));

    // And the reverse: EOF-encoded data is not mistaken for metadata.
    let encoded = VideoStego::from_bytes(stego.hide_eof(&token).unwrap());
    assert!(matches!(
        encoded.extract_metadata(),
        Err(StegoError::NoHiddenData)
    ));
}

/// Carriers without hidden data aggregate to NoHiddenData, not to a
/// decryption error or partial garbage.
#[test]
fn test_clean_carriers_report_no_hidden_data() {
    assert!(matches!(
        decode_image(&test_image(40, 40), "pw", None),
        Err(StegoError::NoHiddenData)
    ));
    assert!(matches!(
        decode_text(&test_text(100), "pw", None),
        Err(StegoError::NoHiddenData)
    ));
    assert!(matches!(
        decode_video(
            &VideoStego::from_bytes(test_video_bytes()),
            "pw",
            None,
            &ProgressSink::noop()
        ),
        Err(StegoError::Video(_)) | Err(StegoError::NoHiddenData)
    ));
}

/// Unicode messages survive every text method.
#[test]
fn test_unicode_message_roundtrip() {
    let stego = test_text(1500);
    let message = "Треффпункт: café № 3, 19:30 ☕";

    for method in [TextMethod::Whitespace, TextMethod::ZeroWidth] {
        let encoded = encode_text(&stego, method, message, "pw").unwrap();
        let decoded = decode_text(&TextStego::from_text(encoded), "pw", None).unwrap();
        assert_eq!(decoded.message, message);
    }
}

/// Encoded files survive a write-to-disk round trip.
#[test]
fn test_file_roundtrip_through_disk() {
    let dir = tempfile::tempdir().unwrap();

    // Image via file
    let image_path = dir.path().join("carrier.png");
    std::fs::write(&image_path, test_image(50, 50).to_png_bytes().unwrap()).unwrap();
    let stego = ImageStego::from_file(&image_path).unwrap();
    let encoded = encode_image(&stego, ImageMethod::Chunk, "on disk", "pw").unwrap();
    let encoded_path = dir.path().join("encoded.png");
    std::fs::write(&encoded_path, encoded).unwrap();
    let decoded = decode_image(&ImageStego::from_file(&encoded_path).unwrap(), "pw", None).unwrap();
    assert_eq!(decoded.message, "on disk");

    // Audio via file
    let audio_path = dir.path().join("carrier.wav");
    {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&audio_path, spec).unwrap();
        for i in 0..30_000i32 {
            writer.write_sample(((i % 311) * 17) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    let stego = AudioStego::from_file(&audio_path).unwrap();
    let encoded = encode_audio(&stego, AudioMethod::Lsb, "on disk too", "pw").unwrap();
    let encoded_path = dir.path().join("encoded.wav");
    std::fs::write(&encoded_path, encoded).unwrap();
    let decoded = decode_audio(&AudioStego::from_file(&encoded_path).unwrap(), "pw", None).unwrap();
    assert_eq!(decoded.message, "on disk too");
}

/// The original carrier object is never mutated by encoding.
#[test]
fn test_encode_does_not_mutate_carrier() {
    let stego = test_image(30, 30);
    let before = stego.image().to_rgb8().as_raw().clone();

    let _ = encode_image(&stego, ImageMethod::Lsb, "mutation check", "pw").unwrap();
    let after = stego.image().to_rgb8().as_raw().clone();

    assert_eq!(before, after);
}
