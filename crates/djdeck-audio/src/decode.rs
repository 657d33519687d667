//! Whole-track decoding using symphonia.
//!
//! Tracks are decoded up front on the control thread into planar stereo
//! `f32`, so the render path only ever reads from memory.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::io::Cursor;

use djdeck_core::{Error, Result};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

/// Fully decoded audio, always two planar channels.
///
/// Mono sources are duplicated to both sides; channels past the second are
/// dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    sample_rate: u32,
    channels: [Vec<f32>; 2],
}

impl DecodedAudio {
    /// Build from planar channels. The longer channel is truncated to match.
    pub fn from_planar(sample_rate: u32, mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self {
            sample_rate,
            channels: [left, right],
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of channel 0 (left) or 1 (right).
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Length in seconds, or 0 for an unknown rate.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub(crate) fn into_channels(self) -> [Vec<f32>; 2] {
        self.channels
    }
}

/// Audio decoder wrapping symphonia.
pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl AudioDecoder {
    /// Probe a media source and open its first audio track.
    ///
    /// `extension` is a format hint such as `"wav"`.
    pub fn new(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(source, MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("failed to probe format: {e}")))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::UnsupportedFormat("no audio tracks found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::UnsupportedFormat("unknown sample rate".to_string()))?;
        let channels = track.codec_params.channels.map_or(2, |c| c.count());

        debug!("Audio track: id={track_id}, sample_rate={sample_rate}, channels={channels}");

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("failed to create decoder: {e}")))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Open an in-memory encoded buffer.
    pub fn from_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<Self> {
        Self::new(Box::new(Cursor::new(data)), extension)
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Decode every remaining packet.
    ///
    /// Corrupt frames are skipped; a source that yields no audio at all is an
    /// error.
    pub fn decode_all(mut self) -> Result<DecodedAudio> {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut scratch: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(Error::AudioDecode(format!("failed to read packet: {e}")));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error (skipping): {e}");
                    continue;
                }
                Err(e) => return Err(Error::AudioDecode(format!("decode failed: {e}"))),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let needed = decoded.capacity();
            if scratch.as_ref().map_or(true, |buf| buf.capacity() < needed * channels) {
                scratch = Some(SampleBuffer::new(needed as u64, spec));
            }
            let Some(buffer) = scratch.as_mut() else {
                continue;
            };
            buffer.copy_interleaved_ref(decoded);

            push_frames(buffer.samples(), channels, &mut left, &mut right);
        }

        if left.is_empty() {
            return Err(Error::AudioDecode("source contains no audio".to_string()));
        }

        debug!("Decoded {} frames at {}Hz", left.len(), self.sample_rate);
        Ok(DecodedAudio::from_planar(self.sample_rate, left, right))
    }
}

/// Split interleaved samples into left/right, duplicating mono.
fn push_frames(samples: &[f32], channels: usize, left: &mut Vec<f32>, right: &mut Vec<f32>) {
    if channels == 0 {
        return;
    }
    for frame in samples.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(if channels > 1 { frame[1] } else { frame[0] });
    }
}

/// Map a response MIME type to a probe hint extension.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("wav") || mime.contains("wave") {
        Some("wav")
    } else if mime.contains("mp3") || mime.contains("mpeg") {
        Some("mp3")
    } else if mime.contains("aiff") {
        Some("aiff")
    } else if mime.contains("flac") {
        Some("flac")
    } else if mime.contains("ogg") || mime.contains("vorbis") {
        Some("ogg")
    } else {
        None
    }
}
