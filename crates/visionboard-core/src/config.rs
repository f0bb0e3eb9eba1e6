//! Save and sync settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default autosave interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;
/// History entries kept by the remote store.
pub const REMOTE_HISTORY_CAP: usize = 20;
/// History entries kept locally for guests.
pub const LOCAL_HISTORY_CAP: usize = 10;

/// Local storage keys.
pub const CURRENT_BOARD_KEY: &str = "vision_board_v02_current";
pub const HISTORY_KEY: &str = "vision_board_v02_history";
pub const SETTINGS_KEY: &str = "vision_board_v02_settings";
pub const MIGRATED_KEY: &str = "vision_board_v02_migrated";
pub const GUEST_SESSION_KEY: &str = "vision_board_v02_guest";

/// Settings for [`SyncController`](crate::sync::SyncController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub autosave_interval_secs: u64,
    pub remote_history_cap: usize,
    pub local_history_cap: usize,
    pub current_board_key: String,
    pub history_key: String,
    pub settings_key: String,
    pub migrated_key: String,
    pub guest_session_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            remote_history_cap: REMOTE_HISTORY_CAP,
            local_history_cap: LOCAL_HISTORY_CAP,
            current_board_key: CURRENT_BOARD_KEY.to_string(),
            history_key: HISTORY_KEY.to_string(),
            settings_key: SETTINGS_KEY.to_string(),
            migrated_key: MIGRATED_KEY.to_string(),
            guest_session_key: GUEST_SESSION_KEY.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    /// Same settings with a different autosave interval.
    pub fn with_interval(mut self, secs: u64) -> Self {
        self.autosave_interval_secs = secs;
        self
    }
}
