//! Error types for djdeck.

use thiserror::Error;

/// Result type alias using djdeck's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for djdeck.
#[derive(Error, Debug)]
pub enum Error {
    // Source errors
    #[error("Failed to open source {locator}: {reason}")]
    SourceOpen { locator: String, reason: String },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    #[error("Network error: {0}")]
    Network(String),

    // Output errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    // Control errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::SourceOpen`] from anything displayable.
    pub fn source_open(locator: impl ToString, reason: impl ToString) -> Self {
        Self::SourceOpen {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error means a track could not be opened.
    ///
    /// Decode and network failures during a load count as open failures:
    /// the caller sees the same outcome (previous track kept).
    pub const fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceOpen { .. }
                | Self::UnsupportedFormat(_)
                | Self::AudioDecode(_)
                | Self::Network(_)
        )
    }

    /// Returns true if a control call was rejected.
    pub const fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }
}
