//! Planar sample buffers passed through the render path.

/// A fixed-channel, fixed-capacity block of planar `f32` samples.
///
/// Storage is allocated by [`AudioBlock::new`] or [`AudioBlock::resize`]
/// (both called from `prepare`); everything else works in place so the
/// audio callback never allocates.
#[derive(Debug, Clone, Default)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    capacity: usize,
}

impl AudioBlock {
    /// Create a silent block.
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; num_channels],
            capacity,
        }
    }

    /// Reallocate for a new shape. Not real-time safe.
    pub fn resize(&mut self, num_channels: usize, capacity: usize) {
        if self.channels.len() == num_channels && self.capacity == capacity {
            return;
        }
        *self = Self::new(num_channels, capacity);
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Maximum frames the block can hold.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Mutable samples of one channel.
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Mutable access to the first two channels at once.
    ///
    /// Returns `None` for blocks with fewer than two channels.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        match self.channels.as_mut_slice() {
            [left, right, ..] => Some((left.as_mut_slice(), right.as_mut_slice())),
            _ => None,
        }
    }

    /// Zero the first `frames` frames of every channel.
    pub fn clear(&mut self, frames: usize) {
        let frames = frames.min(self.capacity);
        for channel in &mut self.channels {
            channel[..frames].fill(0.0);
        }
    }

    /// Copy the first `frames` frames of `other` into this block.
    pub fn copy_from(&mut self, other: &Self, frames: usize) {
        let frames = frames.min(self.capacity).min(other.capacity);
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            dst[..frames].copy_from_slice(&src[..frames]);
        }
    }

    /// Add the first `frames` frames of `other` into this block.
    pub fn add_from(&mut self, other: &Self, frames: usize) {
        let frames = frames.min(self.capacity).min(other.capacity);
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            for (d, s) in dst[..frames].iter_mut().zip(&src[..frames]) {
                *d += *s;
            }
        }
    }

    /// Multiply the first `frames` frames of every channel by `gain`.
    pub fn apply_gain(&mut self, gain: f32, frames: usize) {
        if (gain - 1.0).abs() < f32::EPSILON {
            return;
        }
        let frames = frames.min(self.capacity);
        for channel in &mut self.channels {
            for sample in &mut channel[..frames] {
                *sample *= gain;
            }
        }
    }

    /// Write `frames` frames as interleaved samples for a device with
    /// `out_channels` channels.
    ///
    /// Extra device channels are silent; extra block channels are dropped.
    pub fn write_interleaved<T>(&self, out: &mut [T], out_channels: usize, frames: usize)
    where
        T: cpal::FromSample<f32>,
    {
        let frames = frames.min(self.capacity).min(out.len() / out_channels.max(1));
        for (frame, chunk) in out.chunks_mut(out_channels).take(frames).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                let value = self.channels.get(ch).map_or(0.0, |c| c[frame]);
                *sample = T::from_sample_(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_copy() {
        let mut a = AudioBlock::new(2, 4);
        let mut b = AudioBlock::new(2, 4);
        a.channel_mut(0).fill(0.25);
        b.channel_mut(0).fill(0.5);
        b.channel_mut(1).fill(-0.5);

        a.add_from(&b, 2);
        assert_eq!(a.channel(0), &[0.75, 0.75, 0.25, 0.25]);
        assert_eq!(a.channel(1), &[-0.5, -0.5, 0.0, 0.0]);

        a.copy_from(&b, 4);
        assert_eq!(a.channel(0), &[0.5; 4]);
    }

    #[test]
    fn test_clear_respects_capacity() {
        let mut block = AudioBlock::new(2, 3);
        block.channel_mut(1).fill(1.0);
        block.clear(10);
        assert!(block.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_write_interleaved() {
        let mut block = AudioBlock::new(2, 2);
        block.channel_mut(0).copy_from_slice(&[0.1, 0.2]);
        block.channel_mut(1).copy_from_slice(&[-0.1, -0.2]);

        let mut out = [9.0f32; 6];
        block.write_interleaved(&mut out, 3, 2);
        assert_eq!(out, [0.1, -0.1, 0.0, 0.2, -0.2, 0.0]);
    }

    #[test]
    fn test_stereo_mut_requires_two_channels() {
        let mut mono = AudioBlock::new(1, 8);
        assert!(mono.stereo_mut().is_none());
        let mut stereo = AudioBlock::new(2, 8);
        assert!(stereo.stereo_mut().is_some());
    }
}
