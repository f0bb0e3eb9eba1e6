//! Card definitions for the vision board.

use kurbo::{Point, Size, Vec2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Smallest width or height a card may be resized to, in canvas units.
pub const MIN_CARD_SIZE: f64 = 150.0;

/// Size given to freshly added cards.
pub const DEFAULT_CARD_SIZE: Size = Size::new(280.0, 380.0);

/// Largest tilt (either direction) applied when random rotation is enabled.
pub const RANDOM_TILT_DEGREES: f64 = 1.5;

/// Unique identifier for cards.
///
/// Stored as an opaque string so boards written before ids were UUIDs still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a card displays on its front face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    #[default]
    Text,
    Image,
    /// Uploaded video file.
    Video,
    /// Embedded YouTube player.
    Youtube,
    Shape,
}

/// Geometric variant for shape cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeVariant {
    #[default]
    #[serde(alias = "square")]
    Rectangle,
    Circle,
    Pill,
    Star,
}

/// Font family options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    #[serde(rename = "font-serif")]
    Serif,
    #[serde(rename = "font-sans")]
    Sans,
    #[serde(rename = "font-mono")]
    Mono,
}

impl FontFamily {
    /// Generic CSS family name used by the renderer.
    pub fn css_name(&self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::Sans => "sans-serif",
            FontFamily::Mono => "monospace",
        }
    }

    /// Get display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            FontFamily::Serif => "Serif (Editorial)",
            FontFamily::Sans => "Sans (Clean)",
            FontFamily::Mono => "Mono (Tech)",
        }
    }

    /// Get all available font families.
    pub fn all() -> &'static [FontFamily] {
        &[FontFamily::Serif, FontFamily::Sans, FontFamily::Mono]
    }
}

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn toggled(self) -> Self {
        match self {
            FontWeight::Normal => FontWeight::Bold,
            FontWeight::Bold => FontWeight::Normal,
        }
    }
}

/// Font slant options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSlant {
    Normal,
    #[default]
    Italic,
}

impl FontSlant {
    pub fn toggled(self) -> Self {
        match self {
            FontSlant::Normal => FontSlant::Italic,
            FontSlant::Italic => FontSlant::Normal,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Start,
    #[default]
    Center,
    End,
}

/// Style properties for cards.
///
/// Every field has a default so cards saved before a field existed still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardStyle {
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    pub opacity: f64,
    /// Font size in canvas units.
    pub font_size: f64,
    #[serde(deserialize_with = "lenient")]
    pub font_family: FontFamily,
    #[serde(deserialize_with = "lenient")]
    pub font_weight: FontWeight,
    #[serde(rename = "fontStyle", deserialize_with = "lenient")]
    pub font_slant: FontSlant,
    /// Hex color, e.g. `#292524`.
    pub text_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub text_align: TextAlign,
    #[serde(deserialize_with = "lenient")]
    pub vertical_align: VerticalAlign,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            font_size: 32.0,
            font_family: FontFamily::default(),
            font_weight: FontWeight::default(),
            font_slant: FontSlant::default(),
            text_color: "#292524".to_string(),
            background_color: None,
            text_align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
        }
    }
}

impl CardStyle {
    /// Set opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    }
}

/// Deserialize a field, falling back to its default on values this version does not know.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(&value).unwrap_or_else(|e| {
        log::warn!("Unrecognized style value {}: {}", value, e);
        T::default()
    }))
}

/// Reflection fields on the back face of a card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reflection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub identity: String,
    pub practice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q3: Option<String>,
}

/// Kind-specific payload of a card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_text: Option<String>,
    /// Image (or uploaded media) URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub shape_type: Option<ShapeVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_reflection: Option<Reflection>,
    pub style: CardStyle,
}

/// A placed, styled object on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    #[serde(rename = "type", default)]
    pub kind: CardKind,
    /// Center point in canvas coordinates.
    #[serde(flatten)]
    pub position: Point,
    /// Logical size, never below [`MIN_CARD_SIZE`] once resized.
    #[serde(flatten)]
    pub size: Size,
    /// Rotation in degrees. Not normalized.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub is_flipped: bool,
    #[serde(default)]
    pub content: CardContent,
}

impl Card {
    /// Create a card of the given kind centered at `position` with the default size.
    pub fn new(kind: CardKind, position: Point) -> Self {
        let mut content = CardContent::default();
        match kind {
            CardKind::Text => content.front_text = Some("New Intention".to_string()),
            CardKind::Shape => content.shape_type = Some(ShapeVariant::default()),
            _ => {}
        }
        if kind != CardKind::Text {
            content.back_reflection = Some(Reflection::default());
        }
        Self {
            id: CardId::new(),
            kind,
            position,
            size: DEFAULT_CARD_SIZE,
            rotation: 0.0,
            is_flipped: false,
            content,
        }
    }

    /// Create a text card.
    pub fn text(position: Point, text: impl Into<String>) -> Self {
        let mut card = Self::new(CardKind::Text, position);
        card.content.front_text = Some(text.into());
        card
    }

    /// Create an image card.
    pub fn image(position: Point, url: impl Into<String>) -> Self {
        let mut card = Self::new(CardKind::Image, position);
        card.content.front_url = Some(url.into());
        card
    }

    /// Create an embedded video card from any YouTube link form.
    /// Returns `None` if no video id can be extracted.
    pub fn youtube(position: Point, url: &str) -> Option<Self> {
        let video_id = youtube_id(url)?;
        let mut card = Self::new(CardKind::Youtube, position);
        card.content.youtube_url = Some(format!("https://www.youtube.com/embed/{video_id}"));
        Some(card)
    }

    /// Create a shape card.
    pub fn shape(position: Point, variant: ShapeVariant) -> Self {
        let mut card = Self::new(CardKind::Shape, position);
        card.content.shape_type = Some(variant);
        card
    }

    /// Text-only cards have no reflection side.
    pub fn has_back_face(&self) -> bool {
        self.kind != CardKind::Text
    }

    /// Toggle between front and back. Returns whether the card changed.
    pub fn flip(&mut self) -> bool {
        if !self.has_back_face() {
            return false;
        }
        self.is_flipped = !self.is_flipped;
        true
    }

    pub fn rotation_radians(&self) -> f64 {
        self.rotation.to_radians()
    }

    /// Convert a canvas point into the card's local frame (origin at center, unrotated).
    pub fn to_local(&self, point: Point) -> Point {
        let offset = rotate_vec(point - self.position, -self.rotation_radians());
        Point::new(offset.x, offset.y)
    }

    /// Convert a point in the card's local frame back into canvas coordinates.
    pub fn to_canvas(&self, local: Point) -> Point {
        self.position + rotate_vec(local.to_vec2(), self.rotation_radians())
    }

    /// Corners in canvas coordinates: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let hw = self.size.width / 2.0;
        let hh = self.size.height / 2.0;
        [
            self.to_canvas(Point::new(-hw, -hh)),
            self.to_canvas(Point::new(hw, -hh)),
            self.to_canvas(Point::new(hw, hh)),
            self.to_canvas(Point::new(-hw, hh)),
        ]
    }

    /// Check if a canvas point lies on the card.
    pub fn contains(&self, point: Point) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.size.width / 2.0 && local.y.abs() <= self.size.height / 2.0
    }
}

/// Rotate a vector by `radians` (counter-clockwise in a y-up frame, clockwise on screen).
pub fn rotate_vec(v: Vec2, radians: f64) -> Vec2 {
    let (sin, cos) = radians.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Extract the video id from the common YouTube URL shapes.
pub fn youtube_id(url: &str) -> Option<String> {
    let url = url.trim();
    let candidate = if let Some((_, rest)) = url.split_once("youtu.be/") {
        rest
    } else if let Some((_, rest)) = url.split_once("/embed/") {
        rest
    } else if let Some((_, rest)) = url.split_once("/shorts/") {
        rest
    } else if url.contains("youtube.com") {
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))?
    } else {
        return None;
    };

    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Pseudo-random tilt in `-RANDOM_TILT_DEGREES..=RANDOM_TILT_DEGREES`.
/// Uses a counter + hash so it works on every platform without an RNG.
pub fn random_tilt() -> f64 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static TILT_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = TILT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut x = counter.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2_AE35);
    x ^= x >> 16;

    let unit = f64::from(x) / f64::from(u32::MAX);
    (unit * 2.0 - 1.0) * RANDOM_TILT_DEGREES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_text_card_defaults() {
        let card = Card::new(CardKind::Text, Point::new(10.0, 20.0));
        assert_eq!(card.size, DEFAULT_CARD_SIZE);
        assert_eq!(card.content.front_text.as_deref(), Some("New Intention"));
        assert!(card.content.back_reflection.is_none());
        assert!(!card.has_back_face());
    }

    #[test]
    fn test_text_card_does_not_flip() {
        let mut card = Card::text(Point::ZERO, "Soft Power");
        assert!(!card.flip());
        assert!(!card.is_flipped);

        let mut image = Card::image(Point::ZERO, "https://example.com/a.jpg");
        assert!(image.flip());
        assert!(image.is_flipped);
    }

    #[test]
    fn test_serialized_field_names() {
        let card = Card::text(Point::new(100.0, 100.0), "Hello");
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["x"], 100.0);
        assert_eq!(json["width"], 280.0);
        assert_eq!(json["isFlipped"], false);
        assert_eq!(json["content"]["frontText"], "Hello");
        assert_eq!(json["content"]["style"]["fontFamily"], "font-serif");
        assert_eq!(json["content"]["style"]["fontStyle"], "italic");
    }

    #[test]
    fn test_legacy_card_without_style_loads() {
        let json = r#"{
            "id": "1", "type": "text", "x": 100, "y": 100,
            "width": 280, "height": 380, "rotation": -2,
            "content": { "frontText": "Soft Power", "backReflection": { "identity": "", "practice": "" } },
            "isFlipped": false
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.id.as_str(), "1");
        assert!((card.rotation + 2.0).abs() < f64::EPSILON);
        assert_eq!(card.content.style, CardStyle::default());
    }

    #[test]
    fn test_local_frame_roundtrip() {
        let mut card = Card::text(Point::new(50.0, -20.0), "x");
        card.rotation = 37.0;
        let p = Point::new(123.0, 45.0);
        let back = card.to_canvas(card.to_local(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_contains_respects_rotation() {
        let mut card = Card::text(Point::ZERO, "x");
        card.size = Size::new(200.0, 20.0);
        assert!(card.contains(Point::new(90.0, 0.0)));
        card.rotation = 90.0;
        assert!(!card.contains(Point::new(90.0, 0.0)));
        assert!(card.contains(Point::new(0.0, 90.0)));
    }

    #[test]
    fn test_youtube_id_forms() {
        assert_eq!(youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_id("https://youtu.be/dQw4w9WgXcQ?t=3").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_id("https://www.youtube.com/shorts/abc_DEF-1").as_deref(), Some("abc_DEF-1"));
        assert_eq!(youtube_id("https://example.com/watch?v=zzz"), None);
    }

    #[test]
    fn test_random_tilt_is_bounded() {
        for _ in 0..1000 {
            let tilt = random_tilt();
            assert!(tilt.abs() <= RANDOM_TILT_DEGREES + f64::EPSILON);
        }
    }

    #[test]
    fn test_unknown_style_values_fall_back() {
        let json = r#"{
            "fontFamily": "font-display", "fontWeight": 700, "fontStyle": "oblique",
            "textAlign": "justify", "verticalAlign": "middle", "fontSize": 18
        }"#;
        let style: CardStyle = serde_json::from_str(json).unwrap();
        assert_eq!(style.font_family, FontFamily::Serif);
        assert_eq!(style.font_weight, FontWeight::Normal);
        assert_eq!(style.font_slant, FontSlant::Italic);
        assert_eq!(style.text_align, TextAlign::Center);
        assert_eq!(style.vertical_align, VerticalAlign::Center);
        assert!((style.font_size - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_square_loads_as_rectangle() {
        let content: CardContent = serde_json::from_str(r#"{"shapeType": "square"}"#).unwrap();
        assert_eq!(content.shape_type, Some(ShapeVariant::Rectangle));
        let content: CardContent = serde_json::from_str(r#"{"shapeType": "hexagon"}"#).unwrap();
        assert_eq!(content.shape_type, None);
        let content: CardContent = serde_json::from_str(r#"{"shapeType": null}"#).unwrap();
        assert_eq!(content.shape_type, None);

        let json = serde_json::to_value(Card::shape(Point::ZERO, ShapeVariant::Rectangle)).unwrap();
        assert_eq!(json["content"]["shapeType"], "rectangle");
    }

    #[test]
    fn test_shape_card() {
        let card = Card::shape(Point::new(5.0, 5.0), ShapeVariant::Star);
        assert_eq!(card.kind, CardKind::Shape);
        assert_eq!(card.content.shape_type, Some(ShapeVariant::Star));
        assert!(card.has_back_face());
        assert!(card.content.back_reflection.is_some());
    }

    #[test]
    fn test_youtube_card_uses_embed_url() {
        let card = Card::youtube(Point::ZERO, "https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(card.kind, CardKind::Youtube);
        assert_eq!(
            card.content.youtube_url.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert!(Card::youtube(Point::ZERO, "https://vimeo.com/123").is_none());
    }

    #[test]
    fn test_font_family_names() {
        assert_eq!(FontFamily::all().len(), 3);
        assert_eq!(FontFamily::all()[0], FontFamily::default());
        assert_eq!(FontFamily::Sans.css_name(), "sans-serif");
        assert_eq!(FontFamily::Mono.css_name(), "monospace");
        assert_eq!(FontFamily::Serif.display_name(), "Serif (Editorial)");
        for family in FontFamily::all() {
            assert!(!family.display_name().is_empty());
        }
    }

    #[test]
    fn test_font_toggles() {
        assert_eq!(FontWeight::Normal.toggled(), FontWeight::Bold);
        assert_eq!(FontWeight::Bold.toggled().toggled(), FontWeight::Bold);
        assert_eq!(FontSlant::default().toggled(), FontSlant::Normal);
        assert_eq!(FontSlant::Normal.toggled(), FontSlant::Italic);
    }

    #[test]
    fn test_opacity_clamped() {
        let mut style = CardStyle::default();
        style.set_opacity(3.0);
        assert!((style.opacity - 1.0).abs() < f64::EPSILON);
        style.set_opacity(-1.0);
        assert!(style.opacity.abs() < f64::EPSILON);
    }
}
