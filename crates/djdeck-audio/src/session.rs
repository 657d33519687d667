//! The composition root: two decks, their mixer and the playlist.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::path::Path;
use std::sync::Arc;

use djdeck_core::{
    Deck, Error, Playlist, PlaylistEntry, QueuedTrack, Result, SourceLocator, Track,
};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::mixer::Mixer;
use crate::output::{render_interleaved, AudioOutput, EngineConfig};
use crate::player::{Player, PlayerEvent};
use crate::source::{DefaultSourceProvider, SourceProvider};

/// Owns everything a DJ session needs and wires it together.
///
/// The host UI talks to the session (or to a deck through [`Session::deck`]);
/// the audio device pulls through [`Session::render_interleaved`] or a cpal
/// stream opened with [`Session::start_output`].
pub struct Session {
    config: EngineConfig,
    left: Arc<Player>,
    right: Arc<Player>,
    mixer: Arc<Mutex<Mixer>>,
    playlist: RwLock<Playlist>,
    output: Option<AudioOutput>,
}

impl Session {
    /// Create a session reading files from disk and `http(s)` URLs.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_provider(config, Arc::new(DefaultSourceProvider))
    }

    /// Create a session with a custom source provider.
    pub fn with_provider(config: EngineConfig, provider: Arc<dyn SourceProvider>) -> Self {
        let left = Arc::new(Player::new(Arc::clone(&provider)));
        let right = Arc::new(Player::new(provider));

        let mut mixer = Mixer::new();
        mixer.add_input(Arc::clone(&left));
        mixer.add_input(Arc::clone(&right));
        mixer.prepare(f64::from(config.sample_rate), config.effective_block_size());

        Self {
            config,
            left,
            right,
            mixer: Arc::new(Mutex::new(mixer)),
            playlist: RwLock::new(Playlist::new()),
            output: None,
        }
    }

    /// The player behind a deck.
    pub fn deck(&self, deck: Deck) -> &Arc<Player> {
        match deck {
            Deck::Left => &self.left,
            Deck::Right => &self.right,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared mixer, for hosts that drive rendering themselves.
    pub const fn mixer(&self) -> &Arc<Mutex<Mixer>> {
        &self.mixer
    }

    // -- Device lifecycle --

    /// Prepare every deck for a new stream shape.
    pub fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        self.config.sample_rate = sample_rate;
        self.config.block_size = block_size;
        self.mixer
            .lock()
            .prepare(f64::from(sample_rate), self.config.effective_block_size());
    }

    /// Fill an interleaved buffer from the mix.
    pub fn render_interleaved(&self, data: &mut [f32], channels: usize) {
        render_interleaved(
            &mut self.mixer.lock(),
            data,
            channels,
            self.config.effective_block_size(),
        );
    }

    /// Release render state on every deck.
    pub fn release(&self) {
        self.mixer.lock().release();
    }

    /// Open the default output device and start pulling the mix.
    pub fn start_output(&mut self) -> Result<()> {
        if self.output.is_some() {
            return Ok(());
        }
        let output = AudioOutput::start(self.config, Arc::clone(&self.mixer))?;
        let negotiated = *output.config();
        info!(
            "Audio output initialized: {} Hz, {} channels, device: {}",
            negotiated.sample_rate,
            negotiated.channels,
            output.device_name()
        );
        self.config = negotiated;
        self.output = Some(output);
        Ok(())
    }

    /// Stop the output stream.
    pub fn stop_output(&mut self) {
        if self.output.take().is_some() {
            self.release();
            debug!("Audio output stopped");
        }
    }

    pub const fn is_output_running(&self) -> bool {
        self.output.is_some()
    }

    // -- Playlist --

    /// Read-only view of the playlist.
    pub fn playlist(&self) -> RwLockReadGuard<'_, Playlist> {
        self.playlist.read()
    }

    pub fn add_entry(&self, locator: impl Into<SourceLocator>, title: impl Into<String>) -> usize {
        self.playlist.write().add_entry(locator, title)
    }

    /// Add every supported file, titled by file stem.
    pub fn add_files<P: AsRef<Path>>(&self, paths: impl IntoIterator<Item = P>) -> usize {
        let added = self.playlist.write().add_files(paths);
        debug!("Added {added} files to the playlist");
        added
    }

    pub fn delete_entry(&self, index: usize) -> Result<PlaylistEntry> {
        self.playlist.write().delete_entry(index)
    }

    pub fn enqueue(&self, index: usize, deck: Deck) -> Result<()> {
        self.playlist.write().enqueue(index, deck)
    }

    pub fn dequeue_next(&self, deck: Deck) -> Option<QueuedTrack> {
        self.playlist.write().dequeue_next(deck)
    }

    pub fn filter(&self, search: &str) -> Vec<usize> {
        self.playlist.read().filter(search)
    }

    // -- Deck loading --

    /// Load a catalog entry straight into a deck.
    pub fn load_entry(&self, index: usize, deck: Deck) -> Result<Track> {
        let track = self
            .playlist
            .read()
            .entry(index)
            .map(PlaylistEntry::to_track)
            .ok_or_else(|| {
                Error::InvalidParameter(format!("playlist index {index} out of range"))
            })?;
        self.deck(deck).load(track.clone())?;
        Ok(track)
    }

    /// Pop the deck's queue and load the track into that deck.
    ///
    /// Returns `Ok(None)` when the queue is empty. A track that fails to load
    /// is still consumed from the queue.
    pub fn play_next(&self, deck: Deck) -> Result<Option<QueuedTrack>> {
        let Some(next) = self.dequeue_next(deck) else {
            debug!("{deck} queue is empty");
            return Ok(None);
        };
        self.deck(deck)
            .load(Track::new(next.locator.clone(), next.title.clone()))?;
        Ok(Some(next))
    }

    /// Drain pending events from both decks.
    pub fn poll_events(&self) -> Vec<(Deck, PlayerEvent)> {
        Deck::ALL
            .iter()
            .flat_map(|&deck| {
                std::iter::from_fn(move || self.deck(deck).try_recv_event()).map(move |e| (deck, e))
            })
            .collect()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodedAudio;

    struct Constant;

    impl SourceProvider for Constant {
        fn open_source(&self, locator: &SourceLocator) -> Result<DecodedAudio> {
            let level = if locator.to_string().contains("loud") { 0.5 } else { 0.1 };
            Ok(DecodedAudio::from_planar(48_000, vec![level; 4_800], vec![level; 4_800]))
        }
    }

    fn session() -> Session {
        let session = Session::with_provider(EngineConfig::default(), Arc::new(Constant));
        session.add_entry("/music/quiet.wav", "Quiet");
        session.add_entry("/music/loud.wav", "Loud");
        session
    }

    #[test]
    fn test_play_next_loads_queue_head() {
        let session = session();
        session.enqueue(1, Deck::Right).unwrap();
        session.enqueue(0, Deck::Right).unwrap();

        let next = session.play_next(Deck::Right).unwrap().unwrap();
        assert_eq!(next.title, "Loud");
        assert_eq!(session.deck(Deck::Right).loaded_track().unwrap().title, "Loud");
        assert!(session.deck(Deck::Left).loaded_track().is_none());
        assert_eq!(session.playlist().queue(Deck::Right).len(), 1);

        assert!(session.play_next(Deck::Left).unwrap().is_none());
    }

    #[test]
    fn test_load_entry_out_of_range() {
        let session = session();
        assert!(session.load_entry(5, Deck::Left).unwrap_err().is_invalid_parameter());
        assert_eq!(session.load_entry(0, Deck::Left).unwrap().title, "Quiet");
    }

    #[test]
    fn test_render_mixes_both_decks() {
        let session = session();
        session.load_entry(0, Deck::Left).unwrap();
        session.load_entry(1, Deck::Right).unwrap();
        session.deck(Deck::Left).start();
        session.deck(Deck::Right).start();

        let mut data = vec![0.0f32; 2 * 1000];
        session.render_interleaved(&mut data, 2);
        assert!(data.iter().all(|&s| (s - 0.6).abs() < 1e-6));
    }

    #[test]
    fn test_poll_events_tags_decks() {
        let session = session();
        session.load_entry(1, Deck::Right).unwrap();
        let events = session.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Deck::Right);
        assert!(matches!(events[0].1, PlayerEvent::Loaded { .. }));
        assert!(session.poll_events().is_empty());
    }
}
