//! Sums player outputs into one stereo block.

use std::sync::Arc;

use crate::block::AudioBlock;
use crate::player::Player;

/// Output channels the mix is rendered in.
pub const MIX_CHANNELS: usize = 2;

/// Sums every registered [`Player`] sample-wise, without extra gain.
///
/// Players are shared, not owned: the session keeps its own handles for
/// control calls.
#[derive(Default)]
pub struct Mixer {
    inputs: Vec<Arc<Player>>,
    scratch: AudioBlock,
    output: AudioBlock,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player as an input.
    pub fn add_input(&mut self, player: Arc<Player>) {
        self.inputs.push(player);
    }

    pub fn inputs(&self) -> &[Arc<Player>] {
        &self.inputs
    }

    /// Allocate mix buffers and prepare every input.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.scratch.resize(MIX_CHANNELS, block_size);
        self.output.resize(MIX_CHANNELS, block_size);
        for input in &self.inputs {
            input.prepare(sample_rate, block_size);
        }
    }

    /// Mix `num_frames` frames (at most the prepared block size).
    pub fn produce_block(&mut self, num_frames: usize) -> &AudioBlock {
        let frames = num_frames.min(self.output.capacity());
        self.output.clear(frames);
        for input in &self.inputs {
            input.produce_block(&mut self.scratch, frames);
            self.output.add_from(&self.scratch, frames);
        }
        &self.output
    }

    /// Propagate release to every input.
    pub fn release(&mut self) {
        for input in &self.inputs {
            input.release();
        }
    }
}
