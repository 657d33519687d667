//! Per-deck queue types.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SourceLocator;
use crate::{Error, Result};

/// One of the two playback decks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Deck {
    Left,
    Right,
}

impl Deck {
    /// Both decks, left first.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Deck {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" | "1" | "a" => Ok(Self::Left),
            "right" | "r" | "2" | "b" => Ok(Self::Right),
            other => Err(Error::InvalidParameter(format!("unknown deck '{other}'"))),
        }
    }
}

/// A queued reference to a playlist row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedTrack {
    pub locator: SourceLocator,
    pub title: String,
    /// Catalog index this entry was queued from. Kept valid across deletions.
    pub row_index: usize,
}

/// The two FIFO queues feeding the decks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckQueues {
    left: VecDeque<QueuedTrack>,
    right: VecDeque<QueuedTrack>,
}

impl DeckQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of one deck's queue, front first.
    pub const fn get(&self, deck: Deck) -> &VecDeque<QueuedTrack> {
        match deck {
            Deck::Left => &self.left,
            Deck::Right => &self.right,
        }
    }

    fn get_mut(&mut self, deck: Deck) -> &mut VecDeque<QueuedTrack> {
        match deck {
            Deck::Left => &mut self.left,
            Deck::Right => &mut self.right,
        }
    }

    /// Append to the back of a deck's queue.
    pub fn push(&mut self, deck: Deck, track: QueuedTrack) {
        self.get_mut(deck).push_back(track);
    }

    /// Pop the front of a deck's queue.
    pub fn pop(&mut self, deck: Deck) -> Option<QueuedTrack> {
        self.get_mut(deck).pop_front()
    }

    /// Whether a catalog row is queued on a deck.
    pub fn contains_row(&self, deck: Deck, row_index: usize) -> bool {
        self.get(deck).iter().any(|t| t.row_index == row_index)
    }

    /// Rebase both queues after catalog row `removed` was deleted.
    ///
    /// Entries for `removed` are dropped; entries above it shift down by one.
    pub fn remove_row(&mut self, removed: usize) {
        for queue in [&mut self.left, &mut self.right] {
            queue.retain(|t| t.row_index != removed);
            for track in queue.iter_mut() {
                if track.row_index > removed {
                    track.row_index -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(row_index: usize) -> QueuedTrack {
        QueuedTrack {
            locator: SourceLocator::parse(&format!("/music/{row_index}.wav")),
            title: format!("Track {row_index}"),
            row_index,
        }
    }

    #[test]
    fn test_deck_parse() {
        assert_eq!("Left".parse::<Deck>().unwrap(), Deck::Left);
        assert_eq!("r".parse::<Deck>().unwrap(), Deck::Right);
        assert!("middle".parse::<Deck>().is_err());
    }

    #[test]
    fn test_fifo_per_deck() {
        let mut queues = DeckQueues::new();
        queues.push(Deck::Left, queued(2));
        queues.push(Deck::Left, queued(0));
        queues.push(Deck::Right, queued(1));

        assert_eq!(queues.pop(Deck::Left).unwrap().row_index, 2);
        assert_eq!(queues.pop(Deck::Left).unwrap().row_index, 0);
        assert!(queues.pop(Deck::Left).is_none());
        assert_eq!(queues.get(Deck::Right).len(), 1);
    }

    #[test]
    fn test_remove_row_rebases_both_queues() {
        let mut queues = DeckQueues::new();
        for row in [0, 3, 1, 3] {
            queues.push(Deck::Left, queued(row));
        }
        queues.push(Deck::Right, queued(3));
        queues.push(Deck::Right, queued(4));

        queues.remove_row(3);

        let left: Vec<_> = queues.get(Deck::Left).iter().map(|t| t.row_index).collect();
        let right: Vec<_> = queues.get(Deck::Right).iter().map(|t| t.row_index).collect();
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![3]);
        assert!(queues.contains_row(Deck::Right, 3));
        assert!(!queues.contains_row(Deck::Left, 3));
    }
}
