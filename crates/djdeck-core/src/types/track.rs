//! Track type and source locators.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// File extensions accepted when adding files to the playlist.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["wav", "mp3", "aif", "aiff", "flac", "ogg"];

/// Where a track's audio comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SourceLocator {
    /// A file on the local filesystem.
    File(PathBuf),
    /// An `http(s)` resource fetched on load.
    Remote(Url),
}

impl SourceLocator {
    /// Parse a user-supplied locator.
    ///
    /// `http://` and `https://` become [`SourceLocator::Remote`], `file://`
    /// URLs are converted to paths, anything else is taken as a path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if let Ok(url) = Url::parse(trimmed) {
            match url.scheme() {
                "http" | "https" => return Self::Remote(url),
                "file" => {
                    if let Ok(path) = url.to_file_path() {
                        return Self::File(path);
                    }
                }
                _ => {}
            }
        }
        Self::File(PathBuf::from(trimmed))
    }

    /// Returns true for locators that need a network fetch.
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Lowercased file extension, used as a format hint.
    pub fn extension(&self) -> Option<String> {
        let ext = match self {
            Self::File(path) => path.extension()?.to_str()?.to_owned(),
            Self::Remote(url) => {
                let segment = url.path_segments()?.next_back()?;
                let (_, ext) = segment.rsplit_once('.')?;
                ext.to_owned()
            }
        };
        Some(ext.to_ascii_lowercase())
    }

    /// Human-readable name derived from the locator (file stem).
    pub fn display_name(&self) -> String {
        match self {
            Self::File(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map_or_else(|| path.display().to_string(), str::to_owned),
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map_or_else(
                    || url.to_string(),
                    |segment| {
                        segment
                            .rsplit_once('.')
                            .map_or(segment, |(stem, _)| stem)
                            .to_owned()
                    },
                ),
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

impl From<&str> for SourceLocator {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<PathBuf> for SourceLocator {
    fn from(value: PathBuf) -> Self {
        Self::File(value)
    }
}

impl From<&Path> for SourceLocator {
    fn from(value: &Path) -> Self {
        Self::File(value.to_path_buf())
    }
}

/// A loadable track: a locator plus the title shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Where the audio lives.
    pub locator: SourceLocator,
    /// Track title.
    pub title: String,
}

impl Track {
    pub fn new(locator: impl Into<SourceLocator>, title: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            title: title.into(),
        }
    }

    /// Create a track titled after its locator's file stem.
    pub fn from_locator(locator: impl Into<SourceLocator>) -> Self {
        let locator = locator.into();
        let title = locator.display_name();
        Self { locator, title }
    }
}

/// Whether a file looks like audio we can add to the playlist.
pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locators() {
        assert_eq!(
            SourceLocator::parse("/music/set.wav"),
            SourceLocator::File(PathBuf::from("/music/set.wav"))
        );
        assert!(SourceLocator::parse("https://example.com/a/b.mp3").is_remote());
        assert_eq!(
            SourceLocator::parse("file:///music/set.wav"),
            SourceLocator::File(PathBuf::from("/music/set.wav"))
        );
    }

    #[test]
    fn test_display_name() {
        let track = Track::from_locator("/music/Deep House.flac");
        assert_eq!(track.title, "Deep House");

        let remote = SourceLocator::parse("https://example.com/mixes/opener.mp3");
        assert_eq!(remote.display_name(), "opener");
        assert_eq!(remote.extension().as_deref(), Some("mp3"));
    }

    #[test]
    fn test_supported_files() {
        assert!(is_supported_audio_file(Path::new("a.wav")));
        assert!(is_supported_audio_file(Path::new("B.MP3")));
        assert!(is_supported_audio_file(Path::new("c.aif")));
        assert!(!is_supported_audio_file(Path::new("notes.txt")));
        assert!(!is_supported_audio_file(Path::new("no_extension")));
    }
}
