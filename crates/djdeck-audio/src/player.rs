//! One playback deck: a decoded track, speed control, gain and a reverb.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use djdeck_core::{Error, Result, SourceLocator, Track};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::atomic::{AtomicF32, AtomicF64};
use crate::block::AudioBlock;
use crate::decode::DecodedAudio;
use crate::effect::{Effect, ReverbEffect};
use crate::output::EngineConfig;
use crate::resample::{convert_rate, Varispeed};
use crate::source::{DefaultSourceProvider, SourceProvider};

/// Events buffered per player before the host drains them.
const EVENT_CAPACITY: usize = 64;

/// Events emitted by a player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A track finished loading.
    Loaded { track: Track, duration_secs: f64 },
    /// A load failed; the previous track is still loaded.
    LoadFailed { locator: SourceLocator, reason: String },
    /// Playback reached the end of the track and stopped.
    Finished,
}

struct LoadedTrack {
    track: Track,
    audio: DecodedAudio,
}

/// State touched by the render callback, guarded by one short lock.
struct Voice {
    loaded: Option<LoadedTrack>,
    head: Varispeed,
    effect: ReverbEffect,
    sample_rate: f64,
}

/// A playback deck.
///
/// All methods take `&self`: plain parameters live in atomics and the
/// render-side state sits behind a mutex that control calls only hold for
/// pointer swaps and parameter writes. Decoding happens on the calling
/// thread before the lock is taken.
pub struct Player {
    voice: Mutex<Voice>,
    provider: Arc<dyn SourceProvider>,
    gain: AtomicF32,
    speed: AtomicF64,
    playing: AtomicBool,
    position_secs: AtomicF64,
    length_secs: AtomicF64,
    events_tx: Sender<PlayerEvent>,
    events_rx: Receiver<PlayerEvent>,
}

impl Player {
    /// Create a player that opens sources through `provider`.
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        let (events_tx, events_rx) = bounded(EVENT_CAPACITY);
        Self {
            voice: Mutex::new(Voice {
                loaded: None,
                head: Varispeed::new(),
                effect: ReverbEffect::new(),
                sample_rate: f64::from(EngineConfig::default().sample_rate),
            }),
            provider,
            gain: AtomicF32::new(1.0),
            speed: AtomicF64::new(1.0),
            playing: AtomicBool::new(false),
            position_secs: AtomicF64::new(0.0),
            length_secs: AtomicF64::new(0.0),
            events_tx,
            events_rx,
        }
    }

    // -- Lifecycle --

    /// Size internal buffers for the output stream.
    ///
    /// A non-positive or non-finite rate is ignored and the previous rate kept.
    pub fn prepare(&self, sample_rate: f64, block_size: usize) {
        let mut voice = self.voice.lock();
        if sample_rate.is_finite() && sample_rate > 0.0 {
            voice.sample_rate = sample_rate;
        } else {
            warn!("Ignoring invalid output sample rate {sample_rate}");
        }
        let rate = voice.sample_rate;
        voice.effect.prepare(rate, block_size);
    }

    /// Drop transient render state (the reverb tail).
    pub fn release(&self) {
        self.voice.lock().effect.reset();
    }

    // -- Loading --

    /// Open and decode `locator`, then swap it in as the current track.
    ///
    /// On failure the current track, position and play state are untouched.
    pub fn load_track(&self, locator: &SourceLocator) -> Result<()> {
        self.load(Track::from_locator(locator.clone()))
    }

    /// Load a track, keeping its title.
    pub fn load(&self, track: Track) -> Result<()> {
        let target_rate = self.output_rate();
        let decoded = self
            .provider
            .open_source(&track.locator)
            .and_then(|audio| convert_rate(audio, target_rate));

        let audio = match decoded {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Failed to load {}: {e}", track.locator);
                self.emit(PlayerEvent::LoadFailed {
                    locator: track.locator,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let duration_secs = audio.duration_secs();
        info!("Loaded \"{}\" ({duration_secs:.2}s)", track.title);

        self.playing.store(false, Ordering::Release);
        let previous = {
            let mut voice = self.voice.lock();
            voice.head.seek(0.0);
            voice.effect.reset();
            self.position_secs.store(0.0);
            self.length_secs.store(duration_secs);
            voice.loaded.replace(LoadedTrack {
                track: track.clone(),
                audio,
            })
        };
        drop(previous);

        self.emit(PlayerEvent::Loaded {
            track,
            duration_secs,
        });
        Ok(())
    }

    /// Release the current track.
    pub fn unload(&self) {
        self.playing.store(false, Ordering::Release);
        let previous = {
            let mut voice = self.voice.lock();
            voice.head.seek(0.0);
            self.position_secs.store(0.0);
            self.length_secs.store(0.0);
            voice.loaded.take()
        };
        if let Some(previous) = previous {
            debug!("Unloaded \"{}\"", previous.track.title);
        }
    }

    /// The loaded track, if any.
    pub fn loaded_track(&self) -> Option<Track> {
        self.voice.lock().loaded.as_ref().map(|l| l.track.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.length_secs.load() > 0.0
    }

    // -- Transport --

    pub fn start(&self) {
        if self.is_loaded() {
            self.playing.store(true, Ordering::Release);
        }
    }

    pub fn stop(&self) {
        self.playing.store(false, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Set the output gain (clamped to 0.0-1.0).
    pub fn set_gain(&self, gain: f32) {
        let gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        self.gain.store(gain);
    }

    pub fn gain(&self) -> f32 {
        self.gain.load()
    }

    /// Set the playback speed ratio. Must be positive and finite.
    pub fn set_speed(&self, ratio: f64) -> Result<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "speed ratio must be positive, got {ratio}"
            )));
        }
        self.speed.store(ratio);
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.speed.load()
    }

    /// Seek to `seconds`, clamped to the track length. No-op without a track.
    pub fn set_position(&self, seconds: f64) {
        let mut voice = self.voice.lock();
        let Some(loaded) = voice.loaded.as_ref() else {
            return;
        };
        let length = loaded.audio.duration_secs();
        let rate = f64::from(loaded.audio.sample_rate());
        let seconds = if seconds.is_nan() { 0.0 } else { seconds.clamp(0.0, length) };
        voice.head.seek(seconds * rate);
        drop(voice);
        self.position_secs.store(seconds);
    }

    /// Seek to a fraction (clamped to 0.0-1.0) of the track length.
    pub fn set_position_relative(&self, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.set_position(fraction * self.length_secs.load());
    }

    /// Current position in seconds.
    pub fn position_secs(&self) -> f64 {
        self.position_secs.load()
    }

    /// Track length in seconds, 0 when nothing is loaded.
    pub fn length_secs(&self) -> f64 {
        self.length_secs.load()
    }

    /// Position as a fraction of the length. Lock-free; safe to poll.
    pub fn position_relative(&self) -> f64 {
        let length = self.length_secs.load();
        if length <= 0.0 {
            return 0.0;
        }
        (self.position_secs.load() / length).clamp(0.0, 1.0)
    }

    // -- Reverb --

    pub fn set_reverb_active(&self, active: bool) {
        self.voice.lock().effect.set_active(active);
    }

    pub fn is_reverb_active(&self) -> bool {
        self.voice.lock().effect.is_active()
    }

    pub fn set_reverb_wet_dry(&self, mix: f32) {
        self.voice.lock().effect.set_wet_dry_mix(mix);
    }

    pub fn reverb_wet_dry(&self) -> f32 {
        self.voice.lock().effect.wet_dry_mix()
    }

    pub fn set_reverb_room_size(&self, size: f32) {
        self.voice.lock().effect.set_room_size(size);
    }

    pub fn reverb_room_size(&self) -> f32 {
        self.voice.lock().effect.room_size()
    }

    pub fn set_reverb_damping(&self, damping: f32) {
        self.voice.lock().effect.set_damping(damping);
    }

    pub fn reverb_damping(&self) -> f32 {
        self.voice.lock().effect.damping()
    }

    // -- Events --

    /// Try to receive an event without blocking.
    pub fn try_recv_event(&self) -> Option<PlayerEvent> {
        self.events_rx.try_recv().ok()
    }

    fn emit(&self, event: PlayerEvent) {
        if self.events_tx.try_send(event).is_err() {
            debug!("Player event queue full, dropping event");
        }
    }

    // -- Rendering --

    /// Render `num_frames` frames into `block`, overwriting it.
    ///
    /// Silent while stopped or empty. Runs on the audio thread: no
    /// allocation, no I/O, no logging.
    pub fn produce_block(&self, block: &mut AudioBlock, num_frames: usize) {
        let frames = num_frames.min(block.capacity());
        block.clear(frames);
        if !self.is_playing() {
            return;
        }

        let mut voice = self.voice.lock();
        let Voice {
            loaded,
            head,
            effect,
            sample_rate,
        } = &mut *voice;
        let Some(loaded) = loaded.as_ref() else {
            return;
        };

        let source_rate = f64::from(loaded.audio.sample_rate());
        let step = self.speed.load() * source_rate / *sample_rate;
        let rendered = head.render(&loaded.audio, step, block, frames);

        block.apply_gain(self.gain.load(), frames);
        effect.process(block, frames);

        // Stored under the lock so a concurrent load's reset is not overwritten
        self.position_secs.store(head.position() / source_rate);

        if rendered < frames {
            self.playing.store(false, Ordering::Release);
            let _ = self.events_tx.try_send(PlayerEvent::Finished);
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn output_rate(&self) -> u32 {
        self.voice.lock().sample_rate.round() as u32
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Arc::new(DefaultSourceProvider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RATE: u32 = 48_000;
    const BLOCK: usize = 256;

    /// Serves a constant-level track for any locator except `missing.wav`.
    struct ConstantSource {
        level: f32,
        frames: usize,
        sample_rate: u32,
    }

    impl SourceProvider for ConstantSource {
        fn open_source(&self, locator: &SourceLocator) -> Result<DecodedAudio> {
            if locator.to_string().ends_with("missing.wav") {
                return Err(Error::source_open(locator, "not found"));
            }
            Ok(DecodedAudio::from_planar(
                self.sample_rate,
                vec![self.level; self.frames],
                vec![self.level; self.frames],
            ))
        }
    }

    fn player(level: f32, frames: usize) -> Player {
        let player = Player::new(Arc::new(ConstantSource {
            level,
            frames,
            sample_rate: RATE,
        }));
        player.prepare(f64::from(RATE), BLOCK);
        player
    }

    fn loaded(level: f32, frames: usize) -> Player {
        let player = player(level, frames);
        player.load_track(&SourceLocator::parse("/music/tone.wav")).unwrap();
        player
    }

    #[test]
    fn test_defaults() {
        let player = player(0.2, 100);
        assert_eq!(player.gain(), 1.0);
        assert_eq!(player.speed(), 1.0);
        assert!(!player.is_playing());
        assert!(!player.is_loaded());
        assert!(!player.is_reverb_active());
        assert_eq!(player.reverb_wet_dry(), 0.5);
        assert_eq!(player.reverb_room_size(), 0.5);
        assert_eq!(player.reverb_damping(), 0.5);
        assert_eq!(player.position_relative(), 0.0);
    }

    #[test]
    fn test_load_emits_event_and_resets_position() {
        let player = loaded(0.2, RATE as usize);
        player.set_position(0.5);
        player.load_track(&SourceLocator::parse("/music/other.wav")).unwrap();

        assert_eq!(player.position_secs(), 0.0);
        assert_eq!(player.loaded_track().unwrap().title, "other");
        assert!(matches!(player.try_recv_event(), Some(PlayerEvent::Loaded { .. })));
        assert!(matches!(player.try_recv_event(), Some(PlayerEvent::Loaded { .. })));
        assert!(player.try_recv_event().is_none());
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let player = loaded(0.2, RATE as usize);
        player.set_gain(0.7);
        player.set_speed(1.5).unwrap();
        player.set_position(0.25);
        player.start();

        let err = player
            .load_track(&SourceLocator::parse("/music/missing.wav"))
            .unwrap_err();
        assert!(err.is_source_failure());
        assert_eq!(player.loaded_track().unwrap().title, "tone");
        assert_eq!(player.position_secs(), 0.25);
        assert!(player.is_playing());
        assert_eq!(player.gain(), 0.7);
        assert_eq!(player.speed(), 1.5);

        let _ = player.try_recv_event();
        assert!(matches!(
            player.try_recv_event(),
            Some(PlayerEvent::LoadFailed { .. })
        ));
    }

    #[test]
    fn test_stopped_player_is_silent() {
        let player = loaded(0.2, RATE as usize);
        let mut block = AudioBlock::new(2, BLOCK);
        block.channel_mut(0).fill(0.9);

        player.produce_block(&mut block, BLOCK);
        assert!(block.channel(0).iter().all(|&s| s == 0.0));
        assert_eq!(player.position_secs(), 0.0);
    }

    #[test]
    fn test_playing_renders_track_with_gain() {
        let player = loaded(0.2, RATE as usize);
        player.start();
        let mut block = AudioBlock::new(2, BLOCK);

        player.produce_block(&mut block, BLOCK);
        assert!(block.channel(0).iter().all(|&s| s == 0.2));

        player.set_gain(0.5);
        player.produce_block(&mut block, BLOCK);
        assert!(block.channel(1).iter().all(|&s| (s - 0.1).abs() < 1e-7));

        let expected = 2.0 * BLOCK as f64 / f64::from(RATE);
        assert!((player.position_secs() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_speed_two_covers_twice_the_span() {
        let normal = loaded(0.2, RATE as usize);
        let fast = loaded(0.2, RATE as usize);
        fast.set_speed(2.0).unwrap();
        normal.start();
        fast.start();

        let mut block = AudioBlock::new(2, BLOCK);
        normal.produce_block(&mut block, BLOCK);
        fast.produce_block(&mut block, BLOCK);
        assert_eq!(fast.position_secs(), 2.0 * normal.position_secs());
    }

    #[test]
    fn test_invalid_speed_rejected_without_change() {
        let player = player(0.2, 100);
        player.set_speed(1.25).unwrap();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(player.set_speed(bad).unwrap_err().is_invalid_parameter());
        }
        assert_eq!(player.speed(), 1.25);
    }

    #[test]
    fn test_end_of_track_stops_and_reports() {
        let player = loaded(0.2, 100);
        player.start();
        let _ = player.try_recv_event();

        let mut block = AudioBlock::new(2, BLOCK);
        player.produce_block(&mut block, BLOCK);

        assert!(!player.is_playing());
        assert_eq!(block.channel(0)[99], 0.2);
        assert_eq!(block.channel(0)[100], 0.0);
        assert_eq!(player.position_relative(), 1.0);
        assert_eq!(player.try_recv_event(), Some(PlayerEvent::Finished));
    }

    #[test]
    fn test_relative_seek() {
        let player = loaded(0.2, RATE as usize * 4);
        player.set_position_relative(0.25);
        assert!((player.position_secs() - 1.0).abs() < 1e-12);
        assert!((player.position_relative() - 0.25).abs() < 1e-12);

        player.set_position(100.0);
        assert_eq!(player.position_secs(), 4.0);
    }

    #[test]
    fn test_seek_without_track_is_noop() {
        let player = player(0.2, 100);
        player.set_position(3.0);
        player.set_position_relative(0.5);
        assert_eq!(player.position_secs(), 0.0);
        player.start();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_unload() {
        let player = loaded(0.2, 1000);
        player.start();
        player.unload();
        assert!(!player.is_playing());
        assert!(!player.is_loaded());
        assert!(player.loaded_track().is_none());
    }

    #[test]
    fn test_invalid_output_rate_keeps_previous() {
        let player = loaded(0.2, RATE as usize);
        for bad in [0.0, -44_100.0, f64::NAN, f64::INFINITY] {
            player.prepare(bad, BLOCK);
        }
        player.start();

        let mut block = AudioBlock::new(2, BLOCK);
        player.produce_block(&mut block, BLOCK);
        assert!(block.channel(0).iter().all(|&s| s == 0.2));
        assert!(player.is_playing());
        let expected = BLOCK as f64 / f64::from(RATE);
        assert!((player.position_secs() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_load_converts_to_output_rate() {
        let player = Player::new(Arc::new(ConstantSource {
            level: 0.5,
            frames: 44_100,
            sample_rate: 44_100,
        }));
        player.prepare(f64::from(RATE), BLOCK);
        player.load_track(&SourceLocator::parse("/music/cd.wav")).unwrap();
        assert!((player.length_secs() - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_gain_clamped(gain in -4.0f32..4.0) {
            let player = player(0.2, 10);
            player.set_gain(gain);
            prop_assert_eq!(player.gain(), gain.clamp(0.0, 1.0));
        }

        #[test]
        fn prop_reverb_params_clamped(value in -4.0f32..4.0) {
            let player = player(0.2, 10);
            player.set_reverb_wet_dry(value);
            player.set_reverb_room_size(value);
            player.set_reverb_damping(value);
            let clamped = value.clamp(0.0, 1.0);
            prop_assert_eq!(player.reverb_wet_dry(), clamped);
            prop_assert_eq!(player.reverb_room_size(), clamped);
            prop_assert_eq!(player.reverb_damping(), clamped);
        }
    }
}
