//! Steganography for video files.
//!
//! Three methods:
//! - **LSB**: one message bit per RGB channel per pixel, raster order,
//!   frames consumed sequentially. Frames are piped through `ffmpeg` as raw
//!   rgb24 and re-encoded losslessly (FFV1); the original audio track is
//!   remuxed back in, falling back to video-only output with a warning when
//!   remuxing fails.
//! - **Metadata**: `"METASTEGO" + u32le(len) + JSON` inserted near (not at)
//!   the end of the raw container bytes; decode finds the marker anywhere.
//! - **EOF**: `"EOFSTEGO" + u32le(len) + token` appended strictly after all
//!   container bytes; decode rejects a span that does not end exactly at
//!   end-of-file, which is what distinguishes EOF from Metadata on ambiguous
//!   input.
//!
//! LSB requires `ffmpeg`/`ffprobe` on PATH and a lossless output container
//! (.mkv or .avi); Metadata and EOF operate on the container bytes alone.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::stego::bitstream::{marked_bit_len, marked_bits, BitCollector, MARKER_BITS};
use crate::stego::task::ProgressSink;
use crate::stego::{find_tag, rfind_tag, StegoError, VideoMethod, INJECTION_CAPACITY};

/// Marker for the metadata injection method.
const METADATA_TAG: &[u8; 9] = b"METASTEGO";

/// Marker for the EOF injection method.
const EOF_TAG: &[u8; 8] = b"EOFSTEGO";

/// The metadata block is inserted this many bytes before end-of-file.
const METADATA_OFFSET_FROM_EOF: usize = 100;

/// Frame ceiling for LSB decoding, so corrupt input cannot scan forever.
const MAX_DECODE_FRAMES: u64 = 1000;

/// JSON envelope stored by the metadata method.
#[derive(Serialize, Deserialize)]
struct MetadataEnvelope {
    stego: String,
    method: String,
    message: String,
}

/// Properties of the first video stream, as reported by ffprobe.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate as an ffmpeg rational, e.g. "30000/1001".
    pub frame_rate: String,
    /// Frame count when the container reports one.
    pub frames: Option<u64>,
}

impl StreamInfo {
    /// Bytes (and embeddable bits) per rgb24 frame.
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Video steganography handler.
pub struct VideoStego {
    /// Source file, required for the LSB method.
    path: Option<PathBuf>,
    /// Raw container bytes, used by the metadata and EOF methods.
    raw: Vec<u8>,
}

impl VideoStego {
    /// Creates a new VideoStego from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StegoError> {
        let raw = std::fs::read(path.as_ref())?;
        Ok(Self {
            path: Some(path.as_ref().to_path_buf()),
            raw,
        })
    }

    /// Creates a new VideoStego from container bytes only.
    ///
    /// Metadata and EOF methods work as usual; LSB needs a file and fails.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            path: None,
            raw: bytes,
        }
    }

    /// Returns the raw container bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn file_path(&self) -> Result<&Path, StegoError> {
        self.path
            .as_deref()
            .ok_or_else(|| StegoError::Video("carrier is not backed by a file".to_string()))
    }

    /// Probes the first video stream with ffprobe.
    pub fn probe(&self) -> Result<StreamInfo, StegoError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,nb_frames",
                "-of",
                "csv=p=0",
            ])
            .arg(self.file_path()?)
            .output()
            .map_err(|e| StegoError::Video(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(StegoError::UnsupportedFormat(
                "ffprobe could not read the video stream".to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next().unwrap_or("");
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() < 3 {
            return Err(StegoError::UnsupportedFormat(
                "no video stream found in carrier".to_string(),
            ));
        }

        let width: u32 = fields[0]
            .parse()
            .map_err(|_| StegoError::UnsupportedFormat("bad video width".to_string()))?;
        let height: u32 = fields[1]
            .parse()
            .map_err(|_| StegoError::UnsupportedFormat("bad video height".to_string()))?;
        let frame_rate = match fields[2] {
            "" | "0/0" | "N/A" => "25".to_string(),
            rate => rate.to_string(),
        };
        let frames = fields.get(3).and_then(|f| f.parse::<u64>().ok());

        Ok(StreamInfo {
            width,
            height,
            frame_rate,
            frames,
        })
    }

    /// Returns the LSB payload capacity in bytes, when the frame count is known.
    pub fn lsb_capacity(&self) -> Result<Option<usize>, StegoError> {
        let info = self.probe()?;
        Ok(info
            .frames
            .map(|frames| (frames as usize * info.frame_len()).saturating_sub(MARKER_BITS) / 8))
    }

    /// Hides a payload token in frame LSBs, writing the result to `output`.
    ///
    /// Frames are re-encoded with FFV1 (lossless); use a `.mkv` or `.avi`
    /// output path. The source audio track is remuxed into the result when
    /// possible.
    pub fn hide_lsb(
        &self,
        token: &str,
        output: &Path,
        progress: &ProgressSink,
    ) -> Result<(), StegoError> {
        let input = self.file_path()?;
        let info = self.probe()?;
        let frame_len = info.frame_len();
        let payload = token.as_bytes();
        let total_bits = marked_bit_len(payload.len());

        if let Some(frames) = info.frames {
            let capacity = (frames as usize * frame_len).saturating_sub(MARKER_BITS) / 8;
            if payload.len() > capacity {
                return Err(StegoError::CapacityExceeded {
                    needed: payload.len(),
                    capacity,
                });
            }
        }

        let dir = output_dir(output);
        let video_tmp = tempfile::Builder::new()
            .prefix(".polyhide-")
            .suffix(".mkv")
            .tempfile_in(dir)?;

        let mut decoder = spawn_frame_decoder(input)?;
        let mut encoder = spawn_frame_encoder(&info, video_tmp.path())?;

        let mut src = decoder
            .stdout
            .take()
            .ok_or_else(|| StegoError::Video("no pipe from ffmpeg decoder".to_string()))?;
        let mut dst = encoder
            .stdin
            .take()
            .ok_or_else(|| StegoError::Video("no pipe to ffmpeg encoder".to_string()))?;

        let mut frame = vec![0u8; frame_len];
        let mut bits = marked_bits(payload);
        let mut written_bits = 0usize;
        let mut processed = 0u64;

        loop {
            if progress.cancelled() {
                kill_pair(&mut decoder, &mut encoder);
                return Err(StegoError::Cancelled);
            }

            match src.read_exact(&mut frame) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    kill_pair(&mut decoder, &mut encoder);
                    return Err(e.into());
                }
            }

            if written_bits < total_bits {
                written_bits += embed_frame(&mut frame, &mut bits);
            }

            dst.write_all(&frame)?;
            processed += 1;
            progress.report(processed, info.frames);
        }

        drop(src);
        drop(dst);
        let encoder_status = encoder.wait()?;
        let decoder_status = decoder.wait()?;
        if !decoder_status.success() || !encoder_status.success() {
            return Err(StegoError::Video("ffmpeg frame pipeline failed".to_string()));
        }

        // The stream ended before the marker was fully written; the capacity
        // pre-check could not catch this when the frame count was unknown.
        if written_bits < total_bits {
            return Err(StegoError::CapacityExceeded {
                needed: payload.len(),
                capacity: (processed as usize * frame_len).saturating_sub(MARKER_BITS) / 8,
            });
        }

        self.remux_audio(video_tmp.path(), input, output)
    }

    /// Extracts a payload token from frame LSBs.
    pub fn extract_lsb(&self, progress: &ProgressSink) -> Result<String, StegoError> {
        let input = self.file_path()?;
        let info = self.probe()?;
        let frame_len = info.frame_len();

        let mut decoder = spawn_frame_decoder(input)?;
        let mut src = decoder
            .stdout
            .take()
            .ok_or_else(|| StegoError::Video("no pipe from ffmpeg decoder".to_string()))?;

        let mut collector = BitCollector::new();
        let mut frame = vec![0u8; frame_len];
        let mut processed = 0u64;

        let result = loop {
            if progress.cancelled() {
                break Err(StegoError::Cancelled);
            }
            if processed >= MAX_DECODE_FRAMES {
                break Err(StegoError::NoHiddenData);
            }

            match src.read_exact(&mut frame) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break Err(StegoError::NoHiddenData)
                }
                Err(e) => break Err(e.into()),
            }

            processed += 1;
            progress.report(processed, info.frames);

            if scan_frame(&frame, &mut collector) {
                break Ok(());
            }
        };

        let _ = decoder.kill();
        let _ = decoder.wait();
        result?;

        let payload = collector.into_payload().ok_or(StegoError::NoHiddenData)?;
        String::from_utf8(payload).map_err(|_| StegoError::NoHiddenData)
    }

    /// Hides a payload token near the end of the container bytes.
    pub fn hide_metadata(&self, token: &str) -> Result<Vec<u8>, StegoError> {
        if token.len() > INJECTION_CAPACITY {
            return Err(StegoError::CapacityExceeded {
                needed: token.len(),
                capacity: INJECTION_CAPACITY,
            });
        }

        let envelope = MetadataEnvelope {
            stego: "true".to_string(),
            method: "metadata".to_string(),
            message: token.to_string(),
        };
        let json = serde_json::to_string(&envelope)
            .map_err(|e| StegoError::Video(e.to_string()))?;

        let insert = self.raw.len().saturating_sub(METADATA_OFFSET_FROM_EOF);
        let mut out =
            Vec::with_capacity(self.raw.len() + METADATA_TAG.len() + 4 + json.len());
        out.extend_from_slice(&self.raw[..insert]);
        out.extend_from_slice(METADATA_TAG);
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(json.as_bytes());
        out.extend_from_slice(&self.raw[insert..]);
        Ok(out)
    }

    /// Extracts a payload token stored by the metadata method.
    pub fn extract_metadata(&self) -> Result<String, StegoError> {
        let index = find_tag(&self.raw, METADATA_TAG).ok_or(StegoError::NoHiddenData)?;
        let (payload_len, payload_start) = read_length_prefix(&self.raw, index + METADATA_TAG.len())?;

        let available = self.raw.len() - payload_start;
        if payload_len > available {
            return Err(StegoError::TruncatedData {
                expected: payload_len,
                available,
            });
        }

        let json = &self.raw[payload_start..payload_start + payload_len];
        let envelope: MetadataEnvelope =
            serde_json::from_slice(json).map_err(|_| StegoError::NoHiddenData)?;
        if envelope.stego != "true" || envelope.method != "metadata" {
            return Err(StegoError::NoHiddenData);
        }
        Ok(envelope.message)
    }

    /// Appends a payload token strictly after all container bytes.
    pub fn hide_eof(&self, token: &str) -> Result<Vec<u8>, StegoError> {
        if token.len() > INJECTION_CAPACITY {
            return Err(StegoError::CapacityExceeded {
                needed: token.len(),
                capacity: INJECTION_CAPACITY,
            });
        }

        let mut out = Vec::with_capacity(self.raw.len() + EOF_TAG.len() + 4 + token.len());
        out.extend_from_slice(&self.raw);
        out.extend_from_slice(EOF_TAG);
        out.extend_from_slice(&(token.len() as u32).to_le_bytes());
        out.extend_from_slice(token.as_bytes());
        Ok(out)
    }

    /// Extracts a payload token stored by the EOF method.
    ///
    /// The payload span must end exactly at end-of-file.
    pub fn extract_eof(&self) -> Result<String, StegoError> {
        let index = rfind_tag(&self.raw, EOF_TAG).ok_or(StegoError::NoHiddenData)?;
        let (payload_len, payload_start) = read_length_prefix(&self.raw, index + EOF_TAG.len())?;

        let available = self.raw.len() - payload_start;
        if payload_len > available {
            return Err(StegoError::TruncatedData {
                expected: payload_len,
                available,
            });
        }
        if payload_start + payload_len != self.raw.len() {
            return Err(StegoError::NoHiddenData);
        }

        let payload = &self.raw[payload_start..];
        String::from_utf8(payload.to_vec()).map_err(|_| StegoError::NoHiddenData)
    }

    /// Remuxes the source audio track into the freshly encoded video.
    fn remux_audio(
        &self,
        video_tmp: &Path,
        source: &Path,
        output: &Path,
    ) -> Result<(), StegoError> {
        let dir = output_dir(output);
        let mux_tmp = tempfile::Builder::new()
            .prefix(".polyhide-")
            .suffix(".mkv")
            .tempfile_in(dir)?;

        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-i"])
            .arg(video_tmp)
            .arg("-i")
            .arg(source)
            .args(["-map", "0:v:0", "-map", "1:a?", "-c", "copy"])
            .arg(mux_tmp.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => {
                mux_tmp
                    .persist(output)
                    .map_err(|e| StegoError::Io(e.error))?;
                Ok(())
            }
            _ => {
                log::warn!("audio remux failed; writing video-only output");
                std::fs::copy(video_tmp, output)?;
                Ok(())
            }
        }
    }
}

/// Replaces channel LSBs with message bits. Returns the bits written.
fn embed_frame(frame: &mut [u8], bits: &mut impl Iterator<Item = u8>) -> usize {
    let mut written = 0;
    for byte in frame.iter_mut() {
        match bits.next() {
            Some(bit) => {
                *byte = (*byte & 0xFE) | bit;
                written += 1;
            }
            None => break,
        }
    }
    written
}

/// Feeds a frame's LSBs into the collector. Returns true once the marker hit.
fn scan_frame(frame: &[u8], collector: &mut BitCollector) -> bool {
    for byte in frame {
        if collector.push(byte & 1) {
            return true;
        }
    }
    false
}

/// Parses a little-endian u32 length prefix at `offset`.
/// Returns the length and the offset just past it.
fn read_length_prefix(data: &[u8], offset: usize) -> Result<(usize, usize), StegoError> {
    if offset + 4 > data.len() {
        return Err(StegoError::NoHiddenData);
    }
    let len_bytes: [u8; 4] = data[offset..offset + 4]
        .try_into()
        .map_err(|_| StegoError::NoHiddenData)?;
    Ok((u32::from_le_bytes(len_bytes) as usize, offset + 4))
}

/// Kills and reaps both halves of the frame pipeline.
fn kill_pair(decoder: &mut std::process::Child, encoder: &mut std::process::Child) {
    let _ = decoder.kill();
    let _ = encoder.kill();
    let _ = decoder.wait();
    let _ = encoder.wait();
}

fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn spawn_frame_decoder(input: &Path) -> Result<std::process::Child, StegoError> {
    Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(input)
        .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| StegoError::Video(format!("failed to run ffmpeg: {}", e)))
}

fn spawn_frame_encoder(
    info: &StreamInfo,
    output: &Path,
) -> Result<std::process::Child, StegoError> {
    let size = format!("{}x{}", info.width, info.height);
    Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
        .args(["-s", &size, "-r", &info.frame_rate, "-i", "-"])
        .args(["-an", "-c:v", "ffv1"])
        .arg(output)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| StegoError::Video(format!("failed to run ffmpeg: {}", e)))
}

/// Encrypts `message` and embeds it in the carrier video, writing `output`.
pub fn encode_video(
    stego: &VideoStego,
    method: VideoMethod,
    message: &str,
    passphrase: &str,
    output: &Path,
    progress: &ProgressSink,
) -> Result<(), StegoError> {
    let token = crypto::encrypt_message(message, passphrase)?;

    match method {
        VideoMethod::Lsb => stego.hide_lsb(&token, output, progress),
        VideoMethod::Metadata => {
            let bytes = stego.hide_metadata(&token)?;
            std::fs::write(output, bytes)?;
            Ok(())
        }
        VideoMethod::Eof => {
            let bytes = stego.hide_eof(&token)?;
            std::fs::write(output, bytes)?;
            Ok(())
        }
    }
}
