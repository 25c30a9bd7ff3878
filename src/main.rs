//! Polyhide - Hide encrypted messages in everyday files
//!
//! A CLI tool for multi-carrier steganography with authenticated encryption.
//! Supports images (PNG/BMP), WAV audio, video containers, and plain text.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use polyhide::{
    decode_audio, decode_image, decode_text, decode_video, encode_audio, encode_image,
    encode_text, encode_video, AudioMethod, AudioStego, CarrierKind, DecodedMessage,
    ImageMethod, ImageStego, StegoError, TextMethod, TextStego, VideoMethod, VideoStego,
};

/// Polyhide - Hide encrypted messages in everyday files
///
/// Messages are encrypted with ChaCha20-Poly1305 under a passphrase-derived
/// key and embedded into the carrier; the carrier stays usable. Decoding
/// auto-detects the embedding method unless one is forced.
#[derive(Parser)]
#[command(name = "polyhide")]
#[command(version = "0.1.0")]
#[command(about = "Hide encrypted messages in images, audio, video, and text")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message in a carrier file
    ///
    /// The carrier type is detected from the file extension:
    /// .png/.bmp (image), .wav (audio), .mp4/.avi/.mkv/.mov/.m4v/.webm
    /// (video), .txt/.md/.csv/... (text).
    Encode {
        /// Path to the carrier file (never modified)
        #[arg(short, long)]
        carrier: PathBuf,

        /// Path for the encoded output file
        #[arg(short, long)]
        output: PathBuf,

        /// Message to hide (reads from stdin if not provided)
        #[arg(short, long)]
        message: Option<String>,

        /// Passphrase for encryption
        #[arg(short, long)]
        passphrase: String,

        /// Embedding method (defaults per carrier type)
        ///
        /// Image: lsb, chunk | Audio: lsb, chunk
        /// Video: lsb, metadata, eof | Text: whitespace, zero-width
        #[arg(long)]
        method: Option<String>,
    },

    /// Extract a hidden message from an encoded carrier
    Decode {
        /// Path to the encoded carrier file
        #[arg(short, long)]
        carrier: PathBuf,

        /// Passphrase for decryption (must match the encoding passphrase)
        #[arg(short, long)]
        passphrase: String,

        /// Force a specific method instead of auto-detecting
        #[arg(long)]
        method: Option<String>,

        /// Write the message to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how much data a carrier can hold per method
    Capacity {
        /// Path to the carrier file
        #[arg(short, long)]
        carrier: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            carrier,
            output,
            message,
            passphrase,
            method,
        } => encode_cmd(&carrier, &output, message, &passphrase, method.as_deref()),

        Commands::Decode {
            carrier,
            passphrase,
            method,
            output,
        } => decode_cmd(&carrier, &passphrase, method.as_deref(), output.as_ref()),

        Commands::Capacity { carrier } => capacity_cmd(&carrier),
    }
}

/// Determines the carrier kind from the file extension.
fn carrier_kind(path: &Path) -> Result<CarrierKind> {
    CarrierKind::from_path(path).with_context(|| {
        format!(
            "Cannot determine carrier type of {} (supported: .png .bmp .wav \
             .mp4 .avi .mkv .mov .m4v .webm .txt .md .csv .json .xml .html .log)",
            path.display()
        )
    })
}

fn parse_image_method(s: &str) -> Result<ImageMethod> {
    match s {
        "lsb" => Ok(ImageMethod::Lsb),
        "chunk" => Ok(ImageMethod::Chunk),
        _ => bail!("Unknown image method: {}. Use: lsb, chunk", s),
    }
}

fn parse_audio_method(s: &str) -> Result<AudioMethod> {
    match s {
        "lsb" => Ok(AudioMethod::Lsb),
        "chunk" => Ok(AudioMethod::Chunk),
        _ => bail!("Unknown audio method: {}. Use: lsb, chunk", s),
    }
}

fn parse_video_method(s: &str) -> Result<VideoMethod> {
    match s {
        "lsb" => Ok(VideoMethod::Lsb),
        "metadata" => Ok(VideoMethod::Metadata),
        "eof" => Ok(VideoMethod::Eof),
        _ => bail!("Unknown video method: {}. Use: lsb, metadata, eof", s),
    }
}

fn parse_text_method(s: &str) -> Result<TextMethod> {
    match s {
        "whitespace" => Ok(TextMethod::Whitespace),
        "zero-width" | "zerowidth" => Ok(TextMethod::ZeroWidth),
        _ => bail!("Unknown text method: {}. Use: whitespace, zero-width", s),
    }
}

/// Hides a message in a carrier file.
fn encode_cmd(
    carrier: &Path,
    output: &Path,
    message: Option<String>,
    passphrase: &str,
    method: Option<&str>,
) -> Result<()> {
    if passphrase.is_empty() {
        bail!("Passphrase cannot be empty");
    }

    let message = match message {
        Some(m) => m,
        None => {
            eprintln!("Reading message from stdin (Ctrl+D to finish):");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read message from stdin")?;
            buffer.trim().to_string()
        }
    };

    if message.is_empty() {
        bail!("Message cannot be empty");
    }

    let kind = carrier_kind(carrier)?;

    match kind {
        CarrierKind::Image => {
            let method = method.map(parse_image_method).transpose()?.unwrap_or(ImageMethod::Lsb);
            let stego = ImageStego::from_file(carrier)
                .with_context(|| format!("Failed to load image {}", carrier.display()))?;
            let bytes = encode_image(&stego, method, &message, passphrase)?;
            std::fs::write(output, bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("Encoded with image/{} into {}", method, output.display());
        }
        CarrierKind::Audio => {
            let method = method.map(parse_audio_method).transpose()?.unwrap_or(AudioMethod::Lsb);
            let stego = AudioStego::from_file(carrier)
                .with_context(|| format!("Failed to load audio {}", carrier.display()))?;
            let bytes = encode_audio(&stego, method, &message, passphrase)?;
            std::fs::write(output, bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("Encoded with audio/{} into {}", method, output.display());
        }
        CarrierKind::Video => {
            let method = method.map(parse_video_method).transpose()?.unwrap_or(VideoMethod::Lsb);
            let stego = VideoStego::from_file(carrier)
                .with_context(|| format!("Failed to load video {}", carrier.display()))?;

            // Video work can span hundreds of frames; run it as a
            // cancellable background task and show progress.
            let passphrase = passphrase.to_string();
            let output_path = output.to_path_buf();
            let handle = polyhide::spawn(move |sink| {
                encode_video(&stego, method, &message, &passphrase, &output_path, sink)
            });
            drain_progress(&handle.progress);
            handle.join()?;
            eprintln!("Encoded with video/{} into {}", method, output.display());
        }
        CarrierKind::Text => {
            let method = method.map(parse_text_method).transpose()?.unwrap_or(TextMethod::Whitespace);
            let stego = TextStego::from_file(carrier)
                .with_context(|| format!("Failed to load text {}", carrier.display()))?;
            let encoded = encode_text(&stego, method, &message, passphrase)?;
            std::fs::write(output, encoded)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("Encoded with text/{} into {}", method, output.display());
        }
    }

    Ok(())
}

/// Extracts and decrypts a hidden message from a carrier file.
fn decode_cmd(
    carrier: &Path,
    passphrase: &str,
    method: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<()> {
    if passphrase.is_empty() {
        bail!("Passphrase cannot be empty");
    }

    let kind = carrier_kind(carrier)?;

    let decoded: DecodedMessage = match kind {
        CarrierKind::Image => {
            let method = method.map(parse_image_method).transpose()?;
            let stego = ImageStego::from_file(carrier)
                .with_context(|| format!("Failed to load image {}", carrier.display()))?;
            finish_decode(decode_image(&stego, passphrase, method))?
        }
        CarrierKind::Audio => {
            let method = method.map(parse_audio_method).transpose()?;
            let stego = AudioStego::from_file(carrier)
                .with_context(|| format!("Failed to load audio {}", carrier.display()))?;
            finish_decode(decode_audio(&stego, passphrase, method))?
        }
        CarrierKind::Video => {
            let method = method.map(parse_video_method).transpose()?;
            let stego = VideoStego::from_file(carrier)
                .with_context(|| format!("Failed to load video {}", carrier.display()))?;

            let passphrase = passphrase.to_string();
            let handle = polyhide::spawn(move |sink| {
                decode_video(&stego, &passphrase, method, sink)
            });
            drain_progress(&handle.progress);
            finish_decode(handle.join())?
        }
        CarrierKind::Text => {
            let method = method.map(parse_text_method).transpose()?;
            let stego = TextStego::from_file(carrier)
                .with_context(|| format!("Failed to load text {}", carrier.display()))?;
            finish_decode(decode_text(&stego, passphrase, method))?
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, &decoded.message)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} characters to {} (method: {})",
                decoded.message.chars().count(),
                path.display(),
                decoded.method
            );
        }
        None => {
            println!("{}", decoded.message);
            eprintln!("Method: {}", decoded.method);
        }
    }

    Ok(())
}

/// Adds a passphrase hint to decryption failures.
fn finish_decode(result: Result<DecodedMessage, StegoError>) -> Result<DecodedMessage> {
    match result {
        Ok(decoded) => Ok(decoded),
        Err(e @ StegoError::Decryption(_)) => {
            Err(anyhow::Error::new(e).context("Decryption failed - check your passphrase"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints frame progress updates to stderr until the task finishes.
fn drain_progress(progress: &std::sync::mpsc::Receiver<polyhide::FrameProgress>) {
    let mut any = false;
    for update in progress.iter() {
        any = true;
        match update.total {
            Some(total) => eprint!("\rProcessing frame {}/{}", update.processed, total),
            None => eprint!("\rProcessing frame {}", update.processed),
        }
    }
    if any {
        eprintln!();
    }
}

/// Shows per-method capacities for a carrier.
fn capacity_cmd(carrier: &Path) -> Result<()> {
    let kind = carrier_kind(carrier)?;

    match kind {
        CarrierKind::Image => {
            let stego = ImageStego::from_file(carrier)?;
            println!("Image carrier: {}", carrier.display());
            println!("  lsb:   {} message bytes", stego.lsb_message_capacity());
            println!("  chunk: unbounded (grows the file)");
        }
        CarrierKind::Audio => {
            let stego = AudioStego::from_file(carrier)?;
            println!("Audio carrier: {}", carrier.display());
            println!("  {} samples", stego.sample_count());
            println!("  lsb:   {} message bytes", stego.lsb_message_capacity());
            println!("  chunk: unbounded (grows the file)");
        }
        CarrierKind::Video => {
            let stego = VideoStego::from_file(carrier)?;
            println!("Video carrier: {}", carrier.display());
            match stego.lsb_capacity()? {
                Some(capacity) => println!(
                    "  lsb:      {} message bytes",
                    polyhide::crypto::max_message_len(capacity)
                ),
                None => println!("  lsb:      unknown (container reports no frame count)"),
            }
            println!("  metadata: unbounded (grows the file)");
            println!("  eof:      unbounded (grows the file)");
        }
        CarrierKind::Text => {
            let stego = TextStego::from_file(carrier)?;
            println!("Text carrier: {}", carrier.display());
            println!(
                "  whitespace: {} message bytes ({} lines)",
                stego.whitespace_message_capacity(),
                stego.text().lines().count()
            );
            println!(
                "  zero-width: {} message bytes ({} chars)",
                stego.zero_width_message_capacity(),
                stego.text().chars().count()
            );
        }
    }

    Ok(())
}
