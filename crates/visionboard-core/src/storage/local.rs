//! Typed access to the guest fallback store.

use super::{Storage, StorageError, StorageResult};
use crate::board::{BoardDocument, BoardSettings, parse_cards};
use crate::config::SyncConfig;
use crate::history::{HistoryPoint, HistoryRing};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Records which guest session was already copied to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMarker {
    pub guest_session: String,
    pub board_id: Uuid,
}

/// Current board, history and bookkeeping for a guest, kept under fixed keys.
///
/// Unreadable entries are logged and treated as absent.
pub struct LocalBoardStore<S: Storage> {
    storage: Arc<S>,
    config: SyncConfig,
}

impl<S: Storage> LocalBoardStore<S> {
    pub fn new(storage: Arc<S>, config: SyncConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Load a raw entry, mapping a missing key to `None`.
    async fn load_raw(&self, key: &str) -> StorageResult<Option<String>> {
        match self.storage.load(key).await {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load the guest board. `None` if nothing was ever saved.
    pub async fn load_current(&self) -> StorageResult<Option<BoardDocument>> {
        let Some(json) = self.load_raw(&self.config.current_board_key).await? else {
            return Ok(None);
        };
        let value = match serde_json::from_str::<serde_json::Value>(&json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Discarding corrupted local board: {}", e);
                return Ok(Some(BoardDocument::new()));
            }
        };

        let mut document = BoardDocument::from_value_lenient(&value);
        // Older saves stored a bare card array with settings under their own key.
        if value.is_array() {
            document.settings = self.load_settings().await?;
        }
        Ok(Some(document))
    }

    /// Save the guest board and its settings.
    pub async fn save_current(&self, document: &BoardDocument) -> StorageResult<()> {
        let payload = serde_json::to_string(&document.to_payload())?;
        self.storage.save(&self.config.current_board_key, &payload).await?;
        let settings = serde_json::to_string(&document.settings)?;
        self.storage.save(&self.config.settings_key, &settings).await
    }

    /// Board settings saved on their own. Defaults when missing or unreadable.
    pub async fn load_settings(&self) -> StorageResult<BoardSettings> {
        let Some(json) = self.load_raw(&self.config.settings_key).await? else {
            return Ok(BoardSettings::default());
        };
        Ok(serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Discarding corrupted local settings: {}", e);
            BoardSettings::default()
        }))
    }

    /// Load local history, skipping unreadable entries.
    pub async fn load_history(&self) -> StorageResult<HistoryRing> {
        let mut ring = HistoryRing::new(self.config.local_history_cap);
        let Some(json) = self.load_raw(&self.config.history_key).await? else {
            return Ok(ring);
        };
        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&json) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Discarding corrupted local history: {}", e);
                return Ok(ring);
            }
        };
        let points = entries.iter().filter_map(parse_history_point).collect();
        ring.replace_all(points);
        Ok(ring)
    }

    pub async fn save_history(&self, ring: &HistoryRing) -> StorageResult<()> {
        let json = serde_json::to_string(ring.entries())?;
        self.storage.save(&self.config.history_key, &json).await
    }

    /// Whether there is a guest board with at least one card.
    pub async fn has_pending_board(&self) -> StorageResult<bool> {
        Ok(self
            .load_current()
            .await?
            .is_some_and(|document| !document.is_empty()))
    }

    pub async fn guest_session(&self) -> StorageResult<Option<String>> {
        self.load_raw(&self.config.guest_session_key).await
    }

    /// The id of the current guest session, created on first use.
    pub async fn ensure_guest_session(&self) -> StorageResult<String> {
        if let Some(id) = self.guest_session().await? {
            return Ok(id);
        }
        let id = Uuid::new_v4().to_string();
        self.storage.save(&self.config.guest_session_key, &id).await?;
        Ok(id)
    }

    pub async fn load_marker(&self) -> StorageResult<Option<MigrationMarker>> {
        let Some(json) = self.load_raw(&self.config.migrated_key).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&json).ok())
    }

    pub async fn save_marker(&self, marker: &MigrationMarker) -> StorageResult<()> {
        let json = serde_json::to_string(marker)?;
        self.storage.save(&self.config.migrated_key, &json).await
    }

    /// Remove the guest board, its history and session id. Settings and the
    /// migration marker stay.
    pub async fn clear_board(&self) -> StorageResult<()> {
        self.storage.delete(&self.config.current_board_key).await?;
        self.storage.delete(&self.config.history_key).await?;
        self.storage.delete(&self.config.guest_session_key).await
    }
}

/// Read a history entry. Older entries carry only a display label, so their
/// creation time is recovered from the millisecond id. Ids that are not a
/// millisecond timestamp are rejected.
fn parse_history_point(value: &serde_json::Value) -> Option<HistoryPoint> {
    let id = value.get("id")?.as_i64()?;
    DateTime::from_timestamp_millis(id)?;
    if let Ok(point) = serde_json::from_value::<HistoryPoint>(value.clone()) {
        return Some(point);
    }
    Some(HistoryPoint {
        id,
        created_at: DateTime::from_timestamp_millis(id)?,
        cards: parse_cards(value.get("cards")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::storage::{MemoryStorage, block_on};
    use chrono::Utc;
    use kurbo::Point;

    fn store() -> LocalBoardStore<MemoryStorage> {
        LocalBoardStore::new(Arc::new(MemoryStorage::new()), SyncConfig::default())
    }

    #[test]
    fn test_missing_board_is_none() {
        let store = store();
        assert!(block_on(store.load_current()).unwrap().is_none());
        assert!(!block_on(store.has_pending_board()).unwrap());
    }

    #[test]
    fn test_save_and_load_current() {
        let store = store();
        let mut document = BoardDocument::new();
        document.push_card(Card::text(Point::new(1.0, 2.0), "a"));
        document.settings.random_rotation = false;

        block_on(store.save_current(&document)).unwrap();
        let loaded = block_on(store.load_current()).unwrap().unwrap();
        assert_eq!(loaded, document);
        assert!(block_on(store.has_pending_board()).unwrap());
    }

    #[test]
    fn test_corrupted_board_degrades_to_empty() {
        let store = store();
        block_on(store.storage().save("vision_board_v02_current", "{{{")).unwrap();
        let loaded = block_on(store.load_current()).unwrap().unwrap();
        assert!(loaded.is_empty());

        block_on(store.storage().save("vision_board_v02_current", "{\"cards\": \"nope\"}")).unwrap();
        assert!(block_on(store.load_current()).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_legacy_array_uses_separate_settings() {
        let store = store();
        let card = Card::text(Point::ZERO, "legacy");
        let cards = serde_json::to_string(&vec![card]).unwrap();
        block_on(store.storage().save("vision_board_v02_current", &cards)).unwrap();
        block_on(store.storage().save("vision_board_v02_settings", "{\"background\":\"grid\"}")).unwrap();

        let loaded = block_on(store.load_current()).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.settings.background, crate::board::BackgroundPattern::Grid);
    }

    #[test]
    fn test_history_roundtrip_and_corruption() {
        let store = store();
        let mut ring = HistoryRing::new(10);
        ring.push(vec![Card::text(Point::ZERO, "a")], Utc::now());
        block_on(store.save_history(&ring)).unwrap();
        assert_eq!(block_on(store.load_history()).unwrap().len(), 1);

        block_on(store.storage().save("vision_board_v02_history", "42")).unwrap();
        assert!(block_on(store.load_history()).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_history_entries() {
        let store = store();
        let legacy = r#"[{"id": 1736346600000, "timestamp": "Jan 08, 2:30 PM", "cards": []}]"#;
        block_on(store.storage().save("vision_board_v02_history", legacy)).unwrap();
        let ring = block_on(store.load_history()).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.entries()[0].created_at.timestamp_millis(), 1736346600000);
    }

    #[test]
    fn test_history_entry_with_impossible_id_is_skipped() {
        let store = store();
        let json = r#"[
            {"id": 9223372036854775807, "createdAt": "2025-01-08T14:30:00Z", "cards": []},
            {"id": 1736346600000, "createdAt": "2025-01-08T14:30:00Z", "cards": []}
        ]"#;
        block_on(store.storage().save("vision_board_v02_history", json)).unwrap();
        let ring = block_on(store.load_history()).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.entries()[0].id, 1736346600000);
    }

    #[test]
    fn test_guest_session_is_stable_until_cleared() {
        let store = store();
        let first = block_on(store.ensure_guest_session()).unwrap();
        assert_eq!(block_on(store.ensure_guest_session()).unwrap(), first);

        block_on(store.clear_board()).unwrap();
        assert!(block_on(store.guest_session()).unwrap().is_none());
        assert_ne!(block_on(store.ensure_guest_session()).unwrap(), first);
    }

    #[test]
    fn test_marker_survives_clear() {
        let store = store();
        let marker = MigrationMarker {
            guest_session: "g".to_string(),
            board_id: Uuid::new_v4(),
        };
        block_on(store.save_marker(&marker)).unwrap();
        block_on(store.clear_board()).unwrap();
        assert_eq!(block_on(store.load_marker()).unwrap(), Some(marker));
    }
}
