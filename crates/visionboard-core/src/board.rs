//! Board document: ordered cards plus board-level settings.

use crate::card::{Card, CardId, random_tilt};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Background pattern painted behind the cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundPattern {
    #[default]
    Dots,
    Grid,
    Lines,
    Plain,
}

/// Board-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardSettings {
    pub background: BackgroundPattern,
    pub background_color: String,
    /// Give newly added cards a subtle random tilt.
    pub random_rotation: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            background: BackgroundPattern::default(),
            background_color: "#F9F8F6".to_string(),
            random_rotation: true,
        }
    }
}

/// Persisted shape of a board: the "current board" payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardPayload {
    pub cards: Vec<Card>,
    pub settings: BoardSettings,
}

/// A board document.
///
/// Card order is paint order: the last card is drawn on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardDocument {
    cards: Vec<Card>,
    pub settings: BoardSettings,
}

impl BoardDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from existing cards and settings.
    pub fn with_cards(cards: Vec<Card>, settings: BoardSettings) -> Self {
        Self { cards, settings }
    }

    pub fn from_payload(payload: BoardPayload) -> Self {
        Self::with_cards(payload.cards, payload.settings)
    }

    pub fn to_payload(&self) -> BoardPayload {
        BoardPayload {
            cards: self.cards.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Cards in paint order (back to front).
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Add a card on top. Applies a random tilt when the board asks for it.
    pub fn add_card(&mut self, mut card: Card) -> CardId {
        if self.settings.random_rotation {
            card.rotation += random_tilt();
        }
        let id = card.id.clone();
        self.cards.push(card);
        id
    }

    /// Insert a card exactly as given.
    pub fn push_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Remove a card from the document.
    pub fn remove_card(&mut self, id: &CardId) -> Option<Card> {
        let index = self.index_of(id)?;
        Some(self.cards.remove(index))
    }

    /// Apply `update` to a card. Returns false if no such card exists.
    pub fn update_card(&mut self, id: &CardId, update: impl FnOnce(&mut Card)) -> bool {
        match self.get_card_mut(id) {
            Some(card) => {
                update(card);
                true
            }
            None => false,
        }
    }

    /// Get a card by ID.
    pub fn get_card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    /// Get a mutable reference to a card by ID.
    pub fn get_card_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| &card.id == id)
    }

    fn index_of(&self, id: &CardId) -> Option<usize> {
        self.cards.iter().position(|card| &card.id == id)
    }

    /// Bring a card to the front (topmost).
    /// Returns true if the order changed.
    pub fn bring_to_front(&mut self, id: &CardId) -> bool {
        match self.index_of(id) {
            Some(index) if index + 1 < self.cards.len() => {
                let card = self.cards.remove(index);
                self.cards.push(card);
                true
            }
            _ => false,
        }
    }

    /// Replace every card.
    pub fn replace_cards(&mut self, cards: Vec<Card>) {
        self.cards = cards;
    }

    /// Clear all cards from the document.
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Find the topmost card under a canvas point.
    pub fn card_at_point(&self, point: Point) -> Option<&Card> {
        self.cards.iter().rev().find(|card| card.contains(point))
    }

    /// Get the bounding box of all cards.
    pub fn bounds(&self) -> Option<Rect> {
        self.cards
            .iter()
            .flat_map(|card| card.corners())
            .fold(None, |acc: Option<Rect>, corner| {
                Some(match acc {
                    Some(rect) => rect.union_pt(corner),
                    None => Rect::from_points(corner, corner),
                })
            })
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Get the number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Canonical serialization used to decide whether anything changed since
    /// the last save.
    pub fn snapshot_json(&self) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            cards: &'a [Card],
            settings: &'a BoardSettings,
        }
        serde_json::to_string(&Snapshot {
            cards: &self.cards,
            settings: &self.settings,
        })
        .unwrap_or_default()
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_payload())
    }

    /// Deserialize a document from JSON, degrading malformed data to an empty board.
    pub fn from_json_lenient(json: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => Self::from_value_lenient(&value),
            Err(e) => {
                log::warn!("Discarding unreadable board data: {}", e);
                Self::new()
            }
        }
    }

    /// Build a document from either a payload object or a bare card array.
    pub fn from_value_lenient(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(_) => Self::with_cards(parse_cards(value), BoardSettings::default()),
            serde_json::Value::Object(map) => {
                let cards = map.get("cards").map(parse_cards).unwrap_or_default();
                let settings = map
                    .get("settings")
                    .and_then(|s| serde_json::from_value(s.clone()).ok())
                    .unwrap_or_default();
                Self::with_cards(cards, settings)
            }
            _ => {
                log::warn!("Board data is neither a card list nor a board object; starting empty");
                Self::new()
            }
        }
    }
}

/// Parse a card list, skipping entries that fail to deserialize.
/// Anything other than an array yields an empty list.
pub fn parse_cards(value: &serde_json::Value) -> Vec<Card> {
    let Some(items) = value.as_array() else {
        log::warn!("Expected a card array, found {}", value_kind(value));
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Card>(item.clone()) {
            Ok(card) => Some(card),
            Err(e) => {
                log::warn!("Skipping malformed card: {}", e);
                None
            }
        })
        .collect()
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
