//! Sample-rate handling.
//!
//! Two stages: [`convert_rate`] runs rubato once at load time to bring a
//! decoded track to the output rate, and [`Varispeed`] reads the result at an
//! arbitrary speed ratio inside the render callback.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use djdeck_core::{Error, Result};
use rubato::{FftFixedIn, Resampler as RubatoResampler};
use tracing::debug;

use crate::block::AudioBlock;
use crate::decode::DecodedAudio;

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Convert a whole decoded track to `target_rate`.
///
/// Returns the input untouched when the rates already match. The output is
/// aligned to the input (the resampler's delay is removed) and holds
/// `ceil(frames * target / source)` frames.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn convert_rate(audio: DecodedAudio, target_rate: u32) -> Result<DecodedAudio> {
    let source_rate = audio.sample_rate();
    if target_rate == 0 {
        return Err(Error::InvalidParameter("output sample rate must be positive".to_string()));
    }
    if source_rate == target_rate || audio.is_empty() {
        return Ok(audio);
    }

    let frames = audio.frames();
    let expected =
        (frames as f64 * f64::from(target_rate) / f64::from(source_rate)).ceil() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        2,
    )
    .map_err(|e| Error::AudioDecode(format!("Failed to create resampler: {e}")))?;

    let delay = resampler.output_delay();
    let [left, right] = audio.into_channels();
    let mut output = [
        Vec::with_capacity(expected + delay),
        Vec::with_capacity(expected + delay),
    ];
    let mut chunk = vec![Vec::with_capacity(CHUNK_SIZE); 2];
    let mut read = 0;

    // Zero-padded past the end until the delayed tail is flushed
    while output[0].len() < expected + delay {
        let needed = resampler.input_frames_next();
        for (dst, src) in chunk.iter_mut().zip([&left, &right]) {
            dst.clear();
            let end = (read + needed).min(src.len());
            if read < end {
                dst.extend_from_slice(&src[read..end]);
            }
            dst.resize(needed, 0.0);
        }
        read += needed;

        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| Error::AudioDecode(format!("Resample failed: {e}")))?;
        for (dst, src) in output.iter_mut().zip(resampled) {
            dst.extend(src);
        }
    }

    let [mut left, mut right] = output;
    for channel in [&mut left, &mut right] {
        channel.drain(..delay);
        channel.truncate(expected);
    }

    debug!("Resampled {frames} frames {source_rate}Hz -> {target_rate}Hz ({expected} frames)");
    Ok(DecodedAudio::from_planar(target_rate, left, right))
}

/// Fractional read head over decoded audio.
///
/// Reads with 4-point, 3rd-order Hermite interpolation. Integer positions
/// return the stored sample exactly; reads past the end are silent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Varispeed {
    position: f64,
}

impl Varispeed {
    pub const fn new() -> Self {
        Self { position: 0.0 }
    }

    /// Read head in source frames.
    pub const fn position(&self) -> f64 {
        self.position
    }

    /// Move the read head to a source frame.
    pub fn seek(&mut self, frame: f64) {
        self.position = if frame.is_finite() { frame.max(0.0) } else { 0.0 };
    }

    /// Render up to `num_frames` frames into the first two channels of
    /// `block`, advancing `step` source frames per output frame.
    ///
    /// The block must already be silent. Returns how many frames were
    /// rendered before the source ran out; the read head stops at the end.
    #[allow(clippy::cast_precision_loss)]
    pub fn render(
        &mut self,
        source: &DecodedAudio,
        step: f64,
        block: &mut AudioBlock,
        num_frames: usize,
    ) -> usize {
        let frames = num_frames.min(block.capacity());
        let length = source.frames() as f64;
        let start = self.position;

        let mut rendered = frames;
        for ch in 0..block.num_channels().min(2) {
            let samples = source.channel(ch);
            for (i, slot) in block.channel_mut(ch)[..frames].iter_mut().enumerate() {
                let pos = step.mul_add(i as f64, start);
                if pos >= length {
                    rendered = rendered.min(i);
                    break;
                }
                *slot = hermite(samples, pos);
            }
        }

        self.position = if rendered < frames {
            length
        } else {
            step.mul_add(frames as f64, start)
        };
        rendered
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn hermite(samples: &[f32], pos: f64) -> f32 {
    let index = pos.floor();
    let frac = (pos - index) as f32;
    let i = index as isize;

    let at = |offset: isize| -> f32 {
        let idx = (i + offset).max(0);
        #[allow(clippy::cast_sign_loss)]
        samples.get(idx as usize).copied().unwrap_or(0.0)
    };

    let xm1 = at(-1);
    let x0 = at(0);
    let x1 = at(1);
    let x2 = at(2);

    let c0 = x0;
    let c1 = 0.5 * (x1 - xm1);
    let c2 = xm1 - 2.5 * x0 + 2.0 * x1 - 0.5 * x2;
    let c3 = 0.5 * (x2 - xm1) + 1.5 * (x0 - x1);

    ((c3 * frac + c2) * frac + c1) * frac + c0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> DecodedAudio {
        #[allow(clippy::cast_precision_loss)]
        let left: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        let right = left.iter().map(|s| -s).collect();
        DecodedAudio::from_planar(48_000, left, right)
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let audio = ramp(100);
        let converted = convert_rate(audio.clone(), 48_000).unwrap();
        assert_eq!(converted, audio);
    }

    #[test]
    fn test_convert_rate_length_and_level() {
        let audio = DecodedAudio::from_planar(44_100, vec![0.5; 44_100], vec![-0.25; 44_100]);
        let converted = convert_rate(audio, 48_000).unwrap();

        assert_eq!(converted.sample_rate(), 48_000);
        assert_eq!(converted.frames(), 48_000);
        // Away from the edges a constant signal stays constant
        for &s in &converted.channel(0)[4_000..44_000] {
            assert!((s - 0.5).abs() < 0.01, "left sample {s}");
        }
        for &s in &converted.channel(1)[4_000..44_000] {
            assert!((s + 0.25).abs() < 0.01, "right sample {s}");
        }
    }

    #[test]
    fn test_zero_target_rate_rejected() {
        let err = convert_rate(ramp(10), 0).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_unit_step_reads_exact_samples() {
        let audio = ramp(64);
        let mut block = AudioBlock::new(2, 16);
        let mut head = Varispeed::new();

        assert_eq!(head.render(&audio, 1.0, &mut block, 16), 16);
        assert_eq!(block.channel(0)[5], 5.0);
        assert_eq!(block.channel(1)[5], -5.0);
        assert_eq!(head.position(), 16.0);
    }

    #[test]
    fn test_double_step_covers_twice_the_span() {
        let audio = ramp(256);
        let mut slow = Varispeed::new();
        let mut fast = Varispeed::new();
        let mut block = AudioBlock::new(2, 32);

        slow.render(&audio, 1.0, &mut block, 32);
        block.clear(32);
        fast.render(&audio, 2.0, &mut block, 32);

        assert_eq!(fast.position(), 2.0 * slow.position());
        assert_eq!(block.channel(0)[10], 20.0);
    }

    #[test]
    fn test_half_step_interpolates_linear_ramp() {
        let audio = ramp(64);
        let mut block = AudioBlock::new(2, 8);
        let mut head = Varispeed::new();
        head.seek(10.0);

        head.render(&audio, 0.5, &mut block, 8);
        // Hermite reproduces a straight line exactly
        assert!((block.channel(0)[1] - 10.5).abs() < 1e-5);
        assert!((block.channel(0)[3] - 11.5).abs() < 1e-5);
    }

    #[test]
    fn test_render_stops_at_end() {
        let audio = ramp(10);
        let mut block = AudioBlock::new(2, 16);
        let mut head = Varispeed::new();
        head.seek(6.0);

        assert_eq!(head.render(&audio, 1.0, &mut block, 16), 4);
        assert_eq!(head.position(), 10.0);
        assert_eq!(block.channel(0)[3], 9.0);
        assert!(block.channel(0)[4..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_seek_rejects_nan() {
        let mut head = Varispeed::new();
        head.seek(f64::NAN);
        assert_eq!(head.position(), 0.0);
        head.seek(-3.0);
        assert_eq!(head.position(), 0.0);
    }
}
