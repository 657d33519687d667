//! Session playlist: the track catalog plus the per-deck queues.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{is_supported_audio_file, Deck, DeckQueues, QueuedTrack, SourceLocator, Track};
use crate::{Error, Result};

/// One row of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub title: String,
    pub locator: SourceLocator,
}

impl PlaylistEntry {
    /// The track this row loads.
    pub fn to_track(&self) -> Track {
        Track::new(self.locator.clone(), self.title.clone())
    }
}

/// Ordered catalog of entries and the two deck queues that reference it.
///
/// Queue entries refer to catalog rows by index; [`Playlist::delete_entry`]
/// keeps those indices valid. All mutation goes through `&mut self`, so a
/// caller sharing the playlist behind a lock never observes a half-applied
/// delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
    queues: DeckQueues,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// All catalog entries in order.
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Get a catalog entry.
    pub fn entry(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry and return its index.
    pub fn add_entry(&mut self, locator: impl Into<SourceLocator>, title: impl Into<String>) -> usize {
        self.entries.push(PlaylistEntry {
            title: title.into(),
            locator: locator.into(),
        });
        self.entries.len() - 1
    }

    /// Add every supported audio file, titled by file stem.
    ///
    /// Returns how many files were added.
    pub fn add_files<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> usize {
        let mut added = 0;
        for path in paths {
            let path = path.as_ref();
            if !is_supported_audio_file(path) {
                continue;
            }
            let track = Track::from_locator(path);
            self.add_entry(track.locator, track.title);
            added += 1;
        }
        added
    }

    /// Remove a catalog entry, purging and rebasing queued references.
    pub fn delete_entry(&mut self, index: usize) -> Result<PlaylistEntry> {
        self.check_index(index)?;
        self.queues.remove_row(index);
        Ok(self.entries.remove(index))
    }

    /// Queue a catalog entry on a deck.
    pub fn enqueue(&mut self, index: usize, deck: Deck) -> Result<()> {
        self.check_index(index)?;
        let entry = &self.entries[index];
        self.queues.push(
            deck,
            QueuedTrack {
                locator: entry.locator.clone(),
                title: entry.title.clone(),
                row_index: index,
            },
        );
        Ok(())
    }

    /// Pop the next track queued on a deck.
    pub fn dequeue_next(&mut self, deck: Deck) -> Option<QueuedTrack> {
        self.queues.pop(deck)
    }

    /// Read-only view of a deck's queue.
    pub const fn queue(&self, deck: Deck) -> &VecDeque<QueuedTrack> {
        self.queues.get(deck)
    }

    /// Whether a catalog row is queued on a deck.
    pub fn is_queued(&self, index: usize, deck: Deck) -> bool {
        self.queues.contains_row(deck, index)
    }

    /// Catalog indices whose title contains `search`, ignoring case.
    ///
    /// Empty search text matches everything.
    pub fn filter(&self, search: &str) -> Vec<usize> {
        let needle = search.to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| needle.is_empty() || entry.title.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect()
    }

    /// Map a row of the filtered view back to its catalog index.
    pub fn resolve_row(&self, search: &str, row: usize) -> Option<usize> {
        if search.is_empty() {
            return (row < self.entries.len()).then_some(row);
        }
        self.filter(search).get(row).copied()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(Error::InvalidParameter(format!(
                "playlist index {index} out of range (len {})",
                self.entries.len()
            )))
        }
    }
}
