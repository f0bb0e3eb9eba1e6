//! Bounded history of board snapshots.
//!
//! Entries are kept newest first. Pushing past capacity evicts the oldest
//! entry; pushing a card list identical to the newest entry is a no-op.

use crate::card::Card;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of the human-readable timestamp label, e.g. `Jan 08, 2:30 PM`.
pub const LABEL_FORMAT: &str = "%b %d, %-I:%M %p";

/// Format a timestamp the way the board shows "last saved" times.
pub fn format_label(time: DateTime<Utc>) -> String {
    time.format(LABEL_FORMAT).to_string()
}

/// An immutable snapshot of a board's cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    /// Millisecond timestamp, unique within a ring.
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub cards: Vec<Card>,
}

impl HistoryPoint {
    pub fn label(&self) -> String {
        format_label(self.created_at)
    }
}

/// Fixed-capacity, newest-first list of [`HistoryPoint`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing {
    entries: Vec<HistoryPoint>,
    capacity: usize,
}

impl HistoryRing {
    /// Create an empty ring. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a snapshot taken at `now`.
    ///
    /// Returns `None` when `cards` matches the newest entry.
    pub fn push(&mut self, cards: Vec<Card>, now: DateTime<Utc>) -> Option<&HistoryPoint> {
        let mut id = now.timestamp_millis();
        if let Some(newest) = self.entries.first() {
            if same_cards(&newest.cards, &cards) {
                log::debug!("Skipping duplicate history snapshot");
                return None;
            }
            id = id.max(newest.id.saturating_add(1));
        }

        self.entries.insert(
            0,
            HistoryPoint {
                id,
                created_at: now,
                cards,
            },
        );
        self.entries.truncate(self.capacity);
        self.entries.first()
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryPoint] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&HistoryPoint> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn newest(&self) -> Option<&HistoryPoint> {
        self.entries.first()
    }

    /// Replace the contents, e.g. with a list refreshed from the remote store.
    /// Entries are re-sorted newest first and cut to capacity.
    pub fn replace_all(&mut self, mut entries: Vec<HistoryPoint>) {
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(self.capacity);
        self.entries = entries;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn same_cards(a: &[Card], b: &[Card]) -> bool {
    match (serde_json::to_string(a), serde_json::to_string(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
