//! In-memory board collection for one account, with quota enforcement.

use super::{BoardId, BoardSummary, BoardUpdate, CreateBoard, RemoteBoard, RemoteError, RemoteResult, UpdateAck};
use crate::board::BoardSettings;
use crate::card::Card;
use crate::config::REMOTE_HISTORY_CAP;
use crate::history::HistoryRing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Quotas applied per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryLimits {
    pub max_boards: usize,
    /// Upper bound on the serialized card list, in bytes.
    pub max_payload_bytes: usize,
    pub history_cap: usize,
}

impl Default for RepositoryLimits {
    fn default() -> Self {
        Self {
            max_boards: 3,
            max_payload_bytes: 4 * 1024 * 1024,
            history_cap: REMOTE_HISTORY_CAP,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredBoard {
    title: String,
    cards: Vec<Card>,
    settings: BoardSettings,
    updated_at: DateTime<Utc>,
    history: HistoryRing,
}

/// The boards of one account.
#[derive(Debug, Clone, Default)]
pub struct BoardRepository {
    boards: HashMap<BoardId, StoredBoard>,
    limits: RepositoryLimits,
}

impl BoardRepository {
    pub fn new(limits: RepositoryLimits) -> Self {
        Self {
            boards: HashMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> RepositoryLimits {
        self.limits
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Board metadata, most recently updated first.
    pub fn list(&self) -> Vec<BoardSummary> {
        let mut summaries: Vec<_> = self
            .boards
            .iter()
            .map(|(id, board)| BoardSummary {
                id: *id,
                title: board.title.clone(),
                updated_at: board.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    pub fn get(&self, id: BoardId) -> RemoteResult<RemoteBoard> {
        let board = self.stored(id)?;
        Ok(RemoteBoard {
            id,
            title: board.title.clone(),
            cards: board.cards.clone(),
            settings: board.settings.clone(),
            updated_at: board.updated_at,
            history: board.history.entries().to_vec(),
        })
    }

    pub fn create(&mut self, request: CreateBoard, now: DateTime<Utc>) -> RemoteResult<RemoteBoard> {
        if self.boards.len() >= self.limits.max_boards {
            return Err(RemoteError::LimitReached(format!(
                "an account can hold at most {} boards",
                self.limits.max_boards
            )));
        }
        self.check_payload(&request.cards)?;

        let id = Uuid::new_v4();
        let title = if request.title.trim().is_empty() {
            "Untitled board".to_string()
        } else {
            request.title.trim().to_string()
        };
        let mut history = HistoryRing::new(self.limits.history_cap);
        if !request.cards.is_empty() {
            history.push(request.cards.clone(), now);
        }
        self.boards.insert(
            id,
            StoredBoard {
                title,
                cards: request.cards,
                settings: request.settings.unwrap_or_default(),
                updated_at: now,
                history,
            },
        );
        self.get(id)
    }

    /// Replace cards and/or settings. Each accepted card list becomes a
    /// history entry unless it matches the newest one.
    pub fn update(&mut self, id: BoardId, update: BoardUpdate, now: DateTime<Utc>) -> RemoteResult<UpdateAck> {
        if let Some(cards) = &update.cards {
            self.check_payload(cards)?;
        }
        let board = self.stored_mut(id)?;
        if let Some(settings) = update.settings {
            board.settings = settings;
        }
        if let Some(cards) = update.cards {
            board.history.push(cards.clone(), now);
            board.cards = cards;
        }
        board.updated_at = now;
        Ok(UpdateAck {
            updated_at: now,
            history: board.history.entries().to_vec(),
        })
    }

    pub fn rename(&mut self, id: BoardId, title: &str, now: DateTime<Utc>) -> RemoteResult<BoardSummary> {
        let board = self.stored_mut(id)?;
        board.title = title.trim().to_string();
        board.updated_at = now;
        Ok(BoardSummary {
            id,
            title: board.title.clone(),
            updated_at: now,
        })
    }

    pub fn delete(&mut self, id: BoardId) -> RemoteResult<()> {
        self.boards
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(format!("board {}", id)))
    }

    fn stored(&self, id: BoardId) -> RemoteResult<&StoredBoard> {
        self.boards
            .get(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("board {}", id)))
    }

    fn stored_mut(&mut self, id: BoardId) -> RemoteResult<&mut StoredBoard> {
        self.boards
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("board {}", id)))
    }

    fn check_payload(&self, cards: &[Card]) -> RemoteResult<()> {
        let size = serde_json::to_vec(cards)
            .map_err(|e| RemoteError::Server(e.to_string()))?
            .len();
        if size > self.limits.max_payload_bytes {
            return Err(RemoteError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte limit",
                size, self.limits.max_payload_bytes
            )));
        }
        Ok(())
    }
}
