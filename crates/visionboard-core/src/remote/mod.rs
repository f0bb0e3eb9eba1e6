//! Remote board store contract.
//!
//! One [`RemoteStore`] speaks for one signed-in account. Writes are
//! last-write-wins; there is no merge.

mod memory;
mod repository;

#[cfg(not(target_arch = "wasm32"))]
mod http;

pub use memory::MemoryRemoteStore;
pub use repository::{BoardRepository, RepositoryLimits};

#[cfg(not(target_arch = "wasm32"))]
pub use http::{ACCOUNT_HEADER, HttpRemoteStore, error_from_status};

use crate::board::BoardSettings;
use crate::card::Card;
use crate::history::HistoryPoint;
use crate::storage::BoxFuture;
use crate::unfurl::MediaLink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Server-assigned board identifier.
pub type BoardId = Uuid;

/// Remote store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Board-count quota reached.
    #[error("Board limit reached: {0}")]
    LimitReached(String),
    /// Board content exceeds the payload quota.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Not signed in")]
    Unauthorized,
}

impl RemoteError {
    /// Quota rejections need user action and are never retried automatically.
    pub fn is_quota(&self) -> bool {
        matches!(self, RemoteError::LimitReached(_) | RemoteError::PayloadTooLarge(_))
    }

    /// Machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RemoteError::LimitReached(_) => "limit_reached",
            RemoteError::PayloadTooLarge(_) => "payload_too_large",
            RemoteError::NotFound(_) => "not_found",
            RemoteError::Network(_) => "network",
            RemoteError::Server(_) => "server",
            RemoteError::Unauthorized => "unauthorized",
        }
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// JSON error body returned by the board service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A board with its content and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBoard {
    pub id: BoardId,
    pub title: String,
    pub cards: Vec<Card>,
    #[serde(default)]
    pub settings: BoardSettings,
    pub updated_at: DateTime<Utc>,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

/// Board metadata for lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: BoardId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoard {
    pub title: String,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub settings: Option<BoardSettings>,
}

/// Request to replace a board's cards and/or settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate {
    #[serde(default)]
    pub cards: Option<Vec<Card>>,
    #[serde(default)]
    pub settings: Option<BoardSettings>,
}

/// Request to rename a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameBoard {
    pub title: String,
}

/// Request to resolve a link into media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfurlRequest {
    pub url: String,
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub updated_at: DateTime<Utc>,
    /// Refreshed history, newest first.
    pub history: Vec<HistoryPoint>,
}

/// Remote board store for one account.
///
/// Note: On native platforms, implementations must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait RemoteStore: Send + Sync {
    fn fetch_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<RemoteBoard>>;

    /// Board metadata, most recently updated first.
    fn list_boards(&self) -> BoxFuture<'_, RemoteResult<Vec<BoardSummary>>>;

    fn create_board(&self, request: CreateBoard) -> BoxFuture<'_, RemoteResult<RemoteBoard>>;

    fn update_board(&self, id: BoardId, update: BoardUpdate) -> BoxFuture<'_, RemoteResult<UpdateAck>>;

    fn rename_board(&self, id: BoardId, title: &str) -> BoxFuture<'_, RemoteResult<BoardSummary>>;

    fn delete_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<()>>;

    /// Best-effort media extraction from an arbitrary page. `None` if the page
    /// has no usable media.
    fn resolve_media(&self, url: &str) -> BoxFuture<'_, RemoteResult<Option<MediaLink>>>;
}

/// Remote board store for one account (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait RemoteStore {
    fn fetch_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<RemoteBoard>>;

    /// Board metadata, most recently updated first.
    fn list_boards(&self) -> BoxFuture<'_, RemoteResult<Vec<BoardSummary>>>;

    fn create_board(&self, request: CreateBoard) -> BoxFuture<'_, RemoteResult<RemoteBoard>>;

    fn update_board(&self, id: BoardId, update: BoardUpdate) -> BoxFuture<'_, RemoteResult<UpdateAck>>;

    fn rename_board(&self, id: BoardId, title: &str) -> BoxFuture<'_, RemoteResult<BoardSummary>>;

    fn delete_board(&self, id: BoardId) -> BoxFuture<'_, RemoteResult<()>>;

    /// Best-effort media extraction from an arbitrary page. `None` if the page
    /// has no usable media.
    fn resolve_media(&self, url: &str) -> BoxFuture<'_, RemoteResult<Option<MediaLink>>>;
}
