//! Per-deck audio effects.
//!
//! Every effect works on an [`AudioBlock`] in place and owns a wet/dry
//! blend plus an on/off switch. Parameters are clamped on write, so nothing
//! here can fail.

pub mod freeverb;
pub mod reverb;

pub use freeverb::{Freeverb, FreeverbParams};
pub use reverb::ReverbEffect;

use crate::block::AudioBlock;

/// The core effect trait, implemented by every deck effect.
pub trait Effect: Send {
    /// Size internal buffers for the given stream shape.
    ///
    /// Called from the control thread before playback and whenever the
    /// sample rate or block size changes. `process` must not allocate
    /// afterwards.
    fn prepare(&mut self, sample_rate: f64, block_size: usize);

    /// Transform the first `num_frames` frames of `block` in place.
    ///
    /// A no-op while inactive or fully dry. `num_frames` must not exceed the
    /// block size given to [`Effect::prepare`]; frames past it pass through
    /// unprocessed, as does everything before the first `prepare`.
    fn process(&mut self, block: &mut AudioBlock, num_frames: usize);

    /// Set the wet/dry blend (clamped to 0.0-1.0).
    fn set_wet_dry_mix(&mut self, mix: f32);

    /// Current wet/dry blend.
    fn wet_dry_mix(&self) -> f32;

    /// Enable or disable the effect.
    fn set_active(&mut self, active: bool);

    /// Whether the effect is enabled.
    fn is_active(&self) -> bool;

    /// Clear any internal state such as delay lines.
    fn reset(&mut self) {}

    /// Whether `process` would change the signal.
    fn is_engaged(&self) -> bool {
        self.is_active() && self.wet_dry_mix() > 0.0
    }
}

/// Shared on/off and wet/dry state for effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectBase {
    active: bool,
    wet_dry_mix: f32,
}

impl EffectBase {
    pub fn new(active: bool, wet_dry_mix: f32) -> Self {
        Self {
            active,
            wet_dry_mix: clamp_unit(wet_dry_mix),
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub const fn wet_dry_mix(&self) -> f32 {
        self.wet_dry_mix
    }

    pub fn set_wet_dry_mix(&mut self, mix: f32) {
        self.wet_dry_mix = clamp_unit(mix);
    }
}

impl Default for EffectBase {
    fn default() -> Self {
        Self::new(false, 0.0)
    }
}

/// Clamp a normalized parameter, mapping NaN to 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
