//! VisionBoard Core Library
//!
//! Platform-agnostic canvas interaction model and save/sync policy for the
//! vision board. Rendering and UI chrome live outside this crate.

pub mod board;
pub mod card;
pub mod config;
pub mod editor;
pub mod history;
pub mod input;
pub mod remote;
pub mod selection;
pub mod storage;
pub mod sync;
pub mod unfurl;
pub mod viewport;

pub use board::{BackgroundPattern, BoardDocument, BoardSettings};
pub use card::{Card, CardContent, CardId, CardKind, CardStyle, DEFAULT_CARD_SIZE, MIN_CARD_SIZE};
pub use config::SyncConfig;
pub use editor::EditorSession;
pub use history::{HistoryPoint, HistoryRing};
pub use input::{InputState, Modifiers, MouseButton, PointerAction, PointerTarget, WheelAction};
pub use remote::{BoardId, RemoteError, RemoteStore};
pub use selection::{GestureKind, GestureSession, Handle, HandleKind};
pub use storage::{Storage, StorageError};
pub use sync::{SaveStatus, SessionMode, SyncController, SyncError};
pub use unfurl::{MediaLink, UnfurlError, extract_media};
pub use viewport::{MAX_SCALE, MIN_SCALE, Viewport};
