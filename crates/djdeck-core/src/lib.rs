//! # djdeck-core
//!
//! Core types, playlist/queue state, and error handling for the djdeck
//! two-deck player.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
