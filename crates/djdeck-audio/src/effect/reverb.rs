//! Deck reverb: Freeverb with an external wet/dry blend.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use super::{clamp_unit, Effect, EffectBase, Freeverb, FreeverbParams};
use crate::block::AudioBlock;

/// Default wet/dry blend, room size and damping for a fresh deck.
pub const DEFAULT_MIX: f32 = 0.5;
pub const DEFAULT_ROOM_SIZE: f32 = 0.5;
pub const DEFAULT_DAMPING: f32 = 0.5;

/// Stereo reverb whose wet/dry blend is applied outside the engine.
///
/// The engine always runs fully wet (`wet_level = 1`, `dry_level = 0`); the
/// dry signal is kept in a scratch block sized by [`Effect::prepare`] and
/// blended back with the effect's own wet/dry mix.
pub struct ReverbEffect {
    base: EffectBase,
    engine: Freeverb,
    params: FreeverbParams,
    dry: AudioBlock,
}

impl ReverbEffect {
    pub fn new() -> Self {
        let params = FreeverbParams {
            room_size: DEFAULT_ROOM_SIZE,
            damping: DEFAULT_DAMPING,
            wet_level: 1.0,
            dry_level: 0.0,
            width: 1.0,
            freeze_mode: 0.0,
        };
        let mut engine = Freeverb::new();
        engine.set_parameters(params);

        Self {
            base: EffectBase::new(false, DEFAULT_MIX),
            engine,
            params,
            dry: AudioBlock::default(),
        }
    }

    /// Set the room size (clamped to 0.0-1.0).
    pub fn set_room_size(&mut self, size: f32) {
        self.params.room_size = clamp_unit(size);
    }

    pub const fn room_size(&self) -> f32 {
        self.params.room_size
    }

    /// Set the high-frequency damping (clamped to 0.0-1.0).
    pub fn set_damping(&mut self, damping: f32) {
        self.params.damping = clamp_unit(damping);
    }

    pub const fn damping(&self) -> f32 {
        self.params.damping
    }
}

impl Default for ReverbEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ReverbEffect {
    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        self.engine.set_sample_rate(sample_rate);
        self.dry.resize(2, block_size);
    }

    fn process(&mut self, block: &mut AudioBlock, num_frames: usize) {
        if !self.is_engaged() {
            return;
        }
        debug_assert!(
            num_frames <= self.dry.capacity(),
            "reverb asked for {num_frames} frames, prepared for {}",
            self.dry.capacity()
        );
        let frames = num_frames.min(self.dry.capacity()).min(block.capacity());

        self.dry.copy_from(block, frames);

        self.engine.set_parameters(self.params);
        let Some((left, right)) = block.stereo_mut() else {
            return;
        };
        self.engine
            .process_stereo(&mut left[..frames], &mut right[..frames]);

        let mix = self.base.wet_dry_mix();
        let dry_gain = 1.0 - mix;
        for ch in 0..block.num_channels().min(self.dry.num_channels()) {
            let dry = self.dry.channel(ch);
            for (out, &d) in block.channel_mut(ch)[..frames].iter_mut().zip(&dry[..frames]) {
                *out = d * dry_gain + *out * mix;
            }
        }
    }

    fn set_wet_dry_mix(&mut self, mix: f32) {
        self.base.set_wet_dry_mix(mix);
    }

    fn wet_dry_mix(&self) -> f32 {
        self.base.wet_dry_mix()
    }

    fn set_active(&mut self, active: bool) {
        self.base.set_active(active);
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }

    fn reset(&mut self) {
        self.engine.reset();
    }
}
