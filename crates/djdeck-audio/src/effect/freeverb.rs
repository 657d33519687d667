//! Freeverb stereo reverb engine.
//!
//! Jezar's Freeverb topology: eight parallel lowpass-feedback comb filters
//! followed by four series all-pass filters per channel, with the right
//! channel's delay lines offset by a fixed stereo spread.

use super::clamp_unit;

/// Comb filter delay line lengths (in samples at 44.1kHz)
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delay line lengths (in samples at 44.1kHz)
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];

/// Extra delay for the right channel's filters
const STEREO_SPREAD: usize = 23;

const REFERENCE_RATE: f64 = 44_100.0;
const INPUT_GAIN: f32 = 0.015;
const WET_SCALE: f32 = 3.0;
const DRY_SCALE: f32 = 2.0;
const ALLPASS_FEEDBACK: f32 = 0.5;

#[inline]
fn undenormalise(value: f32) -> f32 {
    if value.abs() < 1.0e-15 {
        0.0
    } else {
        value
    }
}

/// Freeverb parameter set, all normalized to 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeverbParams {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
    pub width: f32,
    /// Values >= 0.5 hold the current tail indefinitely.
    pub freeze_mode: f32,
}

impl Default for FreeverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 0.4,
            width: 1.0,
            freeze_mode: 0.0,
        }
    }
}

impl FreeverbParams {
    fn clamped(self) -> Self {
        Self {
            room_size: clamp_unit(self.room_size),
            damping: clamp_unit(self.damping),
            wet_level: clamp_unit(self.wet_level),
            dry_level: clamp_unit(self.dry_level),
            width: clamp_unit(self.width),
            freeze_mode: clamp_unit(self.freeze_mode),
        }
    }

    fn is_frozen(&self) -> bool {
        self.freeze_mode >= 0.5
    }
}

#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    last: f32,
}

impl CombFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
            last: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.last = undenormalise(output * (1.0 - damp) + self.last * damp);
        self.buffer[self.pos] = undenormalise(input + self.last * feedback);
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.last = 0.0;
    }
}

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.pos];
        self.buffer[self.pos] = undenormalise(input + buffered * ALLPASS_FEEDBACK);
        self.pos = (self.pos + 1) % self.buffer.len();
        buffered - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Per-channel filter bank.
#[derive(Debug, Clone)]
struct Channel {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Channel {
    fn new(sample_rate: f64, spread: usize) -> Self {
        let scale = |len: usize| ((len + spread) as f64 * sample_rate / REFERENCE_RATE) as usize;
        Self {
            combs: COMB_TUNINGS.iter().map(|&len| CombFilter::new(scale(len))).collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|&len| AllpassFilter::new(scale(len)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, damp: f32, feedback: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input, damp, feedback);
        }
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }
}

/// Freeverb-style stereo reverb.
#[derive(Debug, Clone)]
pub struct Freeverb {
    sample_rate: f64,
    params: FreeverbParams,
    left: Channel,
    right: Channel,
    gain: f32,
    wet1: f32,
    wet2: f32,
    dry: f32,
    damp: f32,
    feedback: f32,
}

impl Freeverb {
    pub fn new() -> Self {
        let mut reverb = Self {
            sample_rate: REFERENCE_RATE,
            params: FreeverbParams::default(),
            left: Channel::new(REFERENCE_RATE, 0),
            right: Channel::new(REFERENCE_RATE, STEREO_SPREAD),
            gain: 0.0,
            wet1: 0.0,
            wet2: 0.0,
            dry: 0.0,
            damp: 0.0,
            feedback: 0.0,
        };
        reverb.set_parameters(FreeverbParams::default());
        reverb
    }

    /// Resize the delay lines for a sample rate. Allocates; clears the tail.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        let sample_rate = if sample_rate > 0.0 { sample_rate } else { REFERENCE_RATE };
        self.sample_rate = sample_rate;
        self.left = Channel::new(sample_rate, 0);
        self.right = Channel::new(sample_rate, STEREO_SPREAD);
    }

    pub const fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub const fn parameters(&self) -> &FreeverbParams {
        &self.params
    }

    /// Apply a parameter set. Does not allocate.
    pub fn set_parameters(&mut self, params: FreeverbParams) {
        let params = params.clamped();
        let wet = params.wet_level * WET_SCALE;
        self.dry = params.dry_level * DRY_SCALE;
        self.wet1 = 0.5 * wet * (1.0 + params.width);
        self.wet2 = 0.5 * wet * (1.0 - params.width);

        if params.is_frozen() {
            self.gain = 0.0;
            self.damp = 0.0;
            self.feedback = 1.0;
        } else {
            self.gain = INPUT_GAIN;
            self.damp = params.damping * 0.4;
            self.feedback = params.room_size * 0.28 + 0.7;
        }
        self.params = params;
    }

    /// Clear all delay lines.
    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Process two channels in place. Extra samples in the longer slice are
    /// left untouched.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let input = (*l + *r) * self.gain;
            let out_l = self.left.process(input, self.damp, self.feedback);
            let out_r = self.right.process(input, self.damp, self.feedback);

            *l = out_l * self.wet1 + out_r * self.wet2 + *l * self.dry;
            *r = out_r * self.wet1 + out_l * self.wet2 + *r * self.dry;
        }
    }
}

impl Default for Freeverb {
    fn default() -> Self {
        Self::new()
    }
}
