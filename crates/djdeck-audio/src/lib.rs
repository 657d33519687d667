//! # djdeck-audio
//!
//! Real-time playback engine for djdeck.
//!
//! Features:
//! - Whole-track symphonia decoding with load-time rubato rate conversion
//! - Varispeed playback, gain and a Freeverb reverb per deck
//! - Two-deck mixer driven by a cpal output stream or a host callback

pub mod atomic;
pub mod block;
pub mod decode;
pub mod effect;
pub mod mixer;
pub mod output;
pub mod player;
pub mod resample;
pub mod session;
pub mod source;

pub use block::AudioBlock;
pub use decode::{AudioDecoder, DecodedAudio};
pub use effect::{Effect, ReverbEffect};
pub use mixer::Mixer;
pub use output::{list_output_devices, AudioOutput, EngineConfig, OutputDevice};
pub use player::{Player, PlayerEvent};
pub use session::Session;
pub use source::{DefaultSourceProvider, SourceProvider};
