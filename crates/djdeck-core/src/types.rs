//! Core domain types for djdeck.

pub mod playlist;
pub mod queue;
pub mod track;

pub use playlist::{Playlist, PlaylistEntry};
pub use queue::{Deck, DeckQueues, QueuedTrack};
pub use track::{is_supported_audio_file, SourceLocator, Track, SUPPORTED_EXTENSIONS};
