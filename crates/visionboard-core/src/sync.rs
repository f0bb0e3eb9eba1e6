//! Save policy: when the board is persisted, where, and what history is shown.
//!
//! A save is split into three steps so the editing surface stays usable while
//! the write is in flight: [`SyncController::begin_save`] snapshots the board,
//! [`Saver::run`] performs the write, and [`SyncController::finish_save`]
//! records the outcome. [`SyncController::save_now`] and
//! [`SyncController::tick`] run all three in sequence.

use crate::board::BoardDocument;
use crate::config::SyncConfig;
use crate::editor::EditorSession;
use crate::history::{HistoryRing, format_label};
use crate::remote::{BoardId, BoardSummary, BoardUpdate, CreateBoard, RemoteError, RemoteStore, UpdateAck};
use crate::storage::{LocalBoardStore, MigrationMarker, Storage, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Title given to boards created on first sign-in.
pub const DEFAULT_BOARD_TITLE: &str = "My Vision Board";
/// Title given to boards copied from a guest session.
pub const GUEST_BOARD_TITLE: &str = "Guest Board";

/// Save status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
    /// The last attempt failed; the next tick or manual save retries.
    Error,
    /// The remote store refused the write on quota grounds. Nothing is retried
    /// until [`SyncController::acknowledge_limit`].
    LimitReached,
}

/// Where saves go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Guest,
    Authenticated { board_id: BoardId },
}

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// Pending changes could not be saved before leaving the board.
    #[error("Unsaved changes: {0}")]
    Unsaved(String),
}

impl SyncError {
    pub fn is_quota(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_quota())
    }
}

/// A board snapshot waiting to be written.
#[derive(Debug, Clone)]
pub struct SaveJob {
    pub target: SessionMode,
    pub document: BoardDocument,
    /// Canonical serialization, the baseline once the save succeeds.
    pub snapshot: String,
    /// Session revision the snapshot was taken at.
    pub revision: u64,
    pub started_at: DateTime<Utc>,
    /// Local history to extend (guest saves only).
    pub history: Option<HistoryRing>,
}

/// What a successful save returned.
#[derive(Debug, Clone)]
pub enum SaveReceipt {
    Local { history: HistoryRing },
    Remote(UpdateAck),
}

/// Performs save jobs. Cheap to clone; holds only shared handles.
pub struct Saver<L: Storage, R: RemoteStore> {
    local: Arc<LocalBoardStore<L>>,
    remote: Arc<R>,
}

impl<L: Storage, R: RemoteStore> Clone for Saver<L, R> {
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            remote: Arc::clone(&self.remote),
        }
    }
}

impl<L: Storage, R: RemoteStore> Saver<L, R> {
    pub async fn run(&self, job: &SaveJob) -> Result<SaveReceipt, SyncError> {
        match job.target {
            SessionMode::Guest => {
                self.local.ensure_guest_session().await?;
                self.local.save_current(&job.document).await?;
                let mut history = job.history.clone().unwrap_or_else(|| HistoryRing::new(1));
                history.push(job.document.cards().to_vec(), job.started_at);
                self.local.save_history(&history).await?;
                Ok(SaveReceipt::Local { history })
            }
            SessionMode::Authenticated { board_id } => {
                let update = BoardUpdate {
                    cards: Some(job.document.cards().to_vec()),
                    settings: Some(job.document.settings.clone()),
                };
                let ack = self.remote.update_board(board_id, update).await?;
                Ok(SaveReceipt::Remote(ack))
            }
        }
    }
}

/// Decides when and where the board is saved, and tracks the outcome.
pub struct SyncController<L: Storage, R: RemoteStore> {
    local: Arc<LocalBoardStore<L>>,
    remote: Arc<R>,
    config: SyncConfig,
    mode: SessionMode,
    status: SaveStatus,
    /// Human-readable detail for `Error` and `LimitReached`.
    message: Option<String>,
    /// Serialization of the last successfully persisted board.
    last_persisted: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    last_attempt: Option<Instant>,
    saving: bool,
    history: HistoryRing,
    observed_revision: Option<u64>,
    boards: Vec<BoardSummary>,
}

impl<L: Storage, R: RemoteStore> SyncController<L, R> {
    /// Create a controller in guest mode.
    pub fn new(local: Arc<L>, remote: Arc<R>, config: SyncConfig) -> Self {
        let history = HistoryRing::new(config.local_history_cap);
        Self {
            local: Arc::new(LocalBoardStore::new(local, config.clone())),
            remote,
            config,
            mode: SessionMode::Guest,
            status: SaveStatus::Saved,
            message: None,
            last_persisted: None,
            last_saved_at: None,
            last_attempt: None,
            saving: false,
            history,
            observed_revision: None,
            boards: Vec::new(),
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// History of the active board, newest first.
    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    /// Boards from the last [`list_boards`](Self::list_boards).
    pub fn boards(&self) -> &[BoardSummary] {
        &self.boards
    }

    pub fn local(&self) -> &LocalBoardStore<L> {
        &self.local
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// "Last saved" time for display, e.g. `Jan 08, 2:30 PM`.
    pub fn last_saved_label(&self) -> Option<String> {
        self.last_saved_at.map(format_label)
    }

    /// A handle that can run save jobs without borrowing the controller.
    pub fn saver(&self) -> Saver<L, R> {
        Saver {
            local: Arc::clone(&self.local),
            remote: Arc::clone(&self.remote),
        }
    }

    /// Note board changes. Any new revision marks the board unsaved.
    pub fn observe(&mut self, session: &EditorSession) {
        let revision = session.revision();
        if self.observed_revision == Some(revision) {
            return;
        }
        self.observed_revision = Some(revision);
        if !matches!(self.status, SaveStatus::Saving | SaveStatus::LimitReached) {
            self.status = SaveStatus::Unsaved;
        }
    }

    /// Snapshot the board for saving.
    ///
    /// Returns `None` while another save is in flight, while a quota rejection
    /// is unacknowledged, or when nothing changed since the last save.
    pub fn begin_save(&mut self, session: &EditorSession) -> Option<SaveJob> {
        self.observe(session);
        if self.saving || self.status == SaveStatus::LimitReached {
            return None;
        }

        let snapshot = session.document().snapshot_json();
        if self.last_persisted.as_deref() == Some(snapshot.as_str()) {
            self.status = SaveStatus::Saved;
            self.message = None;
            return None;
        }

        self.saving = true;
        self.status = SaveStatus::Saving;
        let history = match self.mode {
            SessionMode::Guest => Some(self.history.clone()),
            SessionMode::Authenticated { .. } => None,
        };
        log::debug!("Saving board ({} cards)", session.document().len());
        Some(SaveJob {
            target: self.mode,
            document: session.document().clone(),
            snapshot,
            revision: session.revision(),
            started_at: Utc::now(),
            history,
        })
    }

    /// Record the outcome of a save job.
    pub fn finish_save(&mut self, job: SaveJob, result: Result<SaveReceipt, SyncError>) {
        self.saving = false;
        if job.target != self.mode {
            // The session switched boards while this save was in flight.
            log::debug!("Ignoring save result for a board that is no longer active");
            return;
        }

        match result {
            Ok(receipt) => {
                match receipt {
                    SaveReceipt::Local { history } => self.history = history,
                    SaveReceipt::Remote(ack) => self.history.replace_all(ack.history),
                }
                self.last_persisted = Some(job.snapshot);
                self.last_saved_at = Some(job.started_at);
                self.message = None;
                self.status = if self.observed_revision == Some(job.revision) {
                    SaveStatus::Saved
                } else {
                    SaveStatus::Unsaved
                };
                log::info!("Board saved");
            }
            Err(e) if e.is_quota() => {
                log::warn!("Save rejected on quota: {}", e);
                self.status = SaveStatus::LimitReached;
                self.message = Some(e.to_string());
            }
            Err(e) => {
                log::error!("Save failed: {}", e);
                self.status = SaveStatus::Error;
                self.message = Some(format!("Not saved: {}", e));
            }
        }
    }

    /// Save immediately, bypassing the autosave timer.
    pub async fn save_now(&mut self, session: &EditorSession) -> SaveStatus {
        if let Some(job) = self.begin_save(session) {
            let result = self.saver().run(&job).await;
            self.finish_save(job, result);
        }
        self.status
    }

    /// Autosave entry point. Saves when the interval has elapsed since the
    /// last attempt and the board changed. Returns true if a save ran.
    pub async fn tick(&mut self, now: Instant, session: &EditorSession) -> bool {
        self.observe(session);
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < self.config.autosave_interval() {
                return false;
            }
        }
        self.last_attempt = Some(now);

        match self.begin_save(session) {
            Some(job) => {
                let result = self.saver().run(&job).await;
                self.finish_save(job, result);
                true
            }
            None => false,
        }
    }

    /// Clear a quota rejection once the user freed space, so the next save retries.
    pub fn acknowledge_limit(&mut self) {
        if self.status == SaveStatus::LimitReached {
            self.status = SaveStatus::Unsaved;
            self.message = None;
            self.last_attempt = None;
        }
    }

    /// Load the active board into the session.
    ///
    /// Guest data that cannot be read loads as an empty board. Remote failures
    /// leave the session untouched and are returned.
    pub async fn load(&mut self, session: &mut EditorSession) -> Result<(), SyncError> {
        match self.mode {
            SessionMode::Guest => {
                let document = match self.local.load_current().await {
                    Ok(document) => document.unwrap_or_default(),
                    Err(e) => {
                        log::warn!("Could not read local board, starting empty: {}", e);
                        BoardDocument::new()
                    }
                };
                self.history = match self.local.load_history().await {
                    Ok(history) => history,
                    Err(e) => {
                        log::warn!("Could not read local history: {}", e);
                        HistoryRing::new(self.config.local_history_cap)
                    }
                };
                session.load_document(document);
                self.last_saved_at = self.history.newest().map(|point| point.created_at);
            }
            SessionMode::Authenticated { board_id } => {
                let board = match self.remote.fetch_board(board_id).await {
                    Ok(board) => board,
                    Err(e) => {
                        self.status = SaveStatus::Error;
                        self.message = Some(format!("Could not load board: {}", e));
                        return Err(e.into());
                    }
                };
                let mut history = HistoryRing::new(self.config.remote_history_cap);
                history.replace_all(board.history);
                self.history = history;
                session.load_document(BoardDocument::with_cards(board.cards, board.settings));
                self.last_saved_at = Some(board.updated_at);
            }
        }
        self.reset_baseline(session);
        Ok(())
    }

    /// Replace the board with a history snapshot.
    ///
    /// The restored cards become the saved baseline; nothing is written until
    /// the next edit. Returns false if the entry does not exist.
    pub fn restore(&mut self, history_id: i64, session: &mut EditorSession) -> bool {
        let Some(point) = self.history.get(history_id) else {
            return false;
        };
        log::info!("Restoring history point {}", point.label());
        session.replace_cards(point.cards.clone());
        self.reset_baseline(session);
        true
    }

    fn reset_baseline(&mut self, session: &EditorSession) {
        self.last_persisted = Some(session.document().snapshot_json());
        self.observed_revision = Some(session.revision());
        self.status = SaveStatus::Saved;
        self.message = None;
        self.last_attempt = None;
    }

    /// Copy a pending guest board to the remote store, once per guest session.
    ///
    /// Returns the remote board holding the guest's work, or `None` when there
    /// was nothing to migrate. Local guest data is cleared afterwards.
    pub async fn migrate_guest_board(&mut self) -> Result<Option<BoardId>, SyncError> {
        let guest = self.local.guest_session().await?;
        if let (Some(guest), Some(marker)) = (&guest, self.local.load_marker().await?) {
            if &marker.guest_session == guest {
                log::info!("Guest board already migrated to {}", marker.board_id);
                self.local.clear_board().await?;
                return Ok(Some(marker.board_id));
            }
        }

        let Some(document) = self.local.load_current().await? else {
            return Ok(None);
        };
        if document.is_empty() {
            return Ok(None);
        }

        let guest = match guest {
            Some(guest) => guest,
            None => self.local.ensure_guest_session().await?,
        };
        let board = self
            .remote
            .create_board(CreateBoard {
                title: GUEST_BOARD_TITLE.to_string(),
                cards: document.cards().to_vec(),
                settings: Some(document.settings.clone()),
            })
            .await
            .map_err(|e| self.surface_quota(e))?;
        self.local
            .save_marker(&MigrationMarker {
                guest_session: guest,
                board_id: board.id,
            })
            .await?;
        self.local.clear_board().await?;
        log::info!("Migrated guest board ({} cards) to {}", document.len(), board.id);
        Ok(Some(board.id))
    }

    /// Switch to authenticated mode: migrate guest work, open a board and load it.
    pub async fn sign_in(&mut self, session: &mut EditorSession) -> Result<BoardId, SyncError> {
        let board_id = match self.migrate_guest_board().await? {
            Some(board_id) => board_id,
            None => self.most_recent_or_new_board().await?,
        };
        self.mode = SessionMode::Authenticated { board_id };
        self.list_boards().await?;
        self.load(session).await?;
        Ok(board_id)
    }

    /// Back to guest mode with whatever the local store holds.
    pub async fn sign_out(&mut self, session: &mut EditorSession) -> Result<(), SyncError> {
        self.mode = SessionMode::Guest;
        self.boards.clear();
        self.load(session).await
    }

    async fn most_recent_or_new_board(&mut self) -> Result<BoardId, SyncError> {
        let boards = self.remote.list_boards().await?;
        if let Some(board) = boards.first() {
            return Ok(board.id);
        }
        let board = self
            .remote
            .create_board(CreateBoard {
                title: DEFAULT_BOARD_TITLE.to_string(),
                ..CreateBoard::default()
            })
            .await
            .map_err(|e| self.surface_quota(e))?;
        Ok(board.id)
    }

    /// Keep a quota rejection's text for display before returning it.
    fn surface_quota(&mut self, e: RemoteError) -> RemoteError {
        if e.is_quota() {
            log::warn!("Board creation rejected on quota: {}", e);
            self.message = Some(e.to_string());
        }
        e
    }

    /// Refresh the board list.
    pub async fn list_boards(&mut self) -> Result<&[BoardSummary], SyncError> {
        self.boards = self.remote.list_boards().await?;
        Ok(&self.boards)
    }

    /// Create an empty board. A board-count rejection is returned and shown,
    /// without touching the active board's save status.
    pub async fn create_board(&mut self, title: &str) -> Result<BoardSummary, SyncError> {
        let request = CreateBoard {
            title: title.to_string(),
            ..CreateBoard::default()
        };
        match self.remote.create_board(request).await {
            Ok(board) => {
                self.list_boards().await?;
                Ok(BoardSummary {
                    id: board.id,
                    title: board.title,
                    updated_at: board.updated_at,
                })
            }
            Err(e) => {
                self.message = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn rename_board(&mut self, board_id: BoardId, title: &str) -> Result<BoardSummary, SyncError> {
        let summary = self.remote.rename_board(board_id, title).await?;
        self.list_boards().await?;
        Ok(summary)
    }

    /// Delete a board. Deleting the active board opens the most recent
    /// remaining one (or a new one).
    pub async fn delete_board(&mut self, board_id: BoardId, session: &mut EditorSession) -> Result<(), SyncError> {
        self.remote.delete_board(board_id).await?;
        if self.mode == (SessionMode::Authenticated { board_id }) {
            let next = self.most_recent_or_new_board().await?;
            self.mode = SessionMode::Authenticated { board_id: next };
            self.load(session).await?;
        }
        self.list_boards().await?;
        Ok(())
    }

    /// Open another board, saving pending changes first. If that save does
    /// not succeed the switch is abandoned so no work is lost.
    pub async fn switch_board(&mut self, board_id: BoardId, session: &mut EditorSession) -> Result<(), SyncError> {
        self.observe(session);
        if self.status != SaveStatus::Saved && self.save_now(session).await != SaveStatus::Saved {
            let reason = self.message.clone().unwrap_or_else(|| "save did not complete".to_string());
            return Err(SyncError::Unsaved(reason));
        }
        let previous = self.mode;
        self.mode = SessionMode::Authenticated { board_id };
        if let Err(e) = self.load(session).await {
            self.mode = previous;
            return Err(e);
        }
        Ok(())
    }
}
