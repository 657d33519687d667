//! Application configuration, loaded from JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use djdeck_audio::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "DJDECK_CONFIG";

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "djdeck=info,djdeck_audio=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preferred output stream shape.
    pub engine: EngineConfig,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Files added to the playlist at startup.
    pub library: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            library: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from `$DJDECK_CONFIG`, else `<config dir>/config.json`.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("com", "djdeck", "djdeck").map(|dirs| dirs.config_dir().join("config.json"))
    }
}
