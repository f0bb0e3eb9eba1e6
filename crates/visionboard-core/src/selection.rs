//! Selection handles and gesture geometry for cards.
//!
//! A gesture records the card's geometry once when it begins. Every pointer
//! move recomputes the result from that start state, never from the previous
//! move, so dropped or coalesced events cannot accumulate drift.

use crate::card::{Card, CardId, MIN_CARD_SIZE, rotate_vec};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 16.0;
/// Distance from the top edge to the rotation handle (canvas units).
pub const ROTATE_HANDLE_OFFSET: f64 = 56.0;
/// Distance the resize handle sits outside the bottom-right corner (canvas units).
pub const RESIZE_HANDLE_OFFSET: f64 = 6.0;
/// Rotation snap increment in degrees.
pub const ROTATION_SNAP_DEGREES: f64 = 15.0;

/// Type of selection handle. Handles only exist on the selected card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Rotation handle above the top edge.
    Rotate,
    /// Resize handle at the bottom-right corner.
    Resize,
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in canvas coordinates) hits this handle.
    /// `tolerance` should be adjusted for viewport scale.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Get the selection handles for a card, rotated with it.
pub fn get_handles(card: &Card) -> [Handle; 2] {
    let hw = card.size.width / 2.0;
    let hh = card.size.height / 2.0;
    [
        Handle::new(
            card.to_canvas(Point::new(0.0, -hh - ROTATE_HANDLE_OFFSET)),
            HandleKind::Rotate,
        ),
        Handle::new(
            card.to_canvas(Point::new(hw + RESIZE_HANDLE_OFFSET, hh + RESIZE_HANDLE_OFFSET)),
            HandleKind::Resize,
        ),
    ]
}

/// Find which handle (if any) is hit at the given canvas point.
pub fn hit_test_handles(card: &Card, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(card)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.kind)
}

/// The three gestures a card supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureKind {
    Drag,
    Rotate,
    Resize,
}

impl From<HandleKind> for GestureKind {
    fn from(handle: HandleKind) -> Self {
        match handle {
            HandleKind::Rotate => GestureKind::Rotate,
            HandleKind::Resize => GestureKind::Resize,
        }
    }
}

/// Geometry produced by a gesture update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardGeometry {
    pub position: Point,
    pub size: Size,
    pub rotation: f64,
}

impl CardGeometry {
    pub fn of(card: &Card) -> Self {
        Self {
            position: card.position,
            size: card.size,
            rotation: card.rotation,
        }
    }

    /// Write this geometry onto a card.
    pub fn apply_to(&self, card: &mut Card) {
        card.position = self.position;
        card.size = self.size;
        card.rotation = self.rotation;
    }
}

/// State of an active gesture on a single card.
#[derive(Debug, Clone)]
pub struct GestureSession {
    /// The card being manipulated.
    pub card_id: CardId,
    pub kind: GestureKind,
    /// Pointer position (canvas coordinates) when the gesture began.
    pub start_point: Point,
    /// Most recent pointer position.
    pub current_point: Point,
    /// Card geometry when the gesture began.
    pub start: CardGeometry,
}

impl GestureSession {
    /// Record the start state of a gesture.
    pub fn begin(kind: GestureKind, card: &Card, pointer: Point) -> Self {
        Self {
            card_id: card.id.clone(),
            kind,
            start_point: pointer,
            current_point: pointer,
            start: CardGeometry::of(card),
        }
    }

    /// Pointer delta since the gesture began.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    /// Recompute the card geometry for a new pointer position.
    /// `snap` rounds rotation to [`ROTATION_SNAP_DEGREES`].
    pub fn update(&mut self, pointer: Point, snap: bool) -> CardGeometry {
        self.current_point = pointer;
        let mut geometry = self.start;
        match self.kind {
            GestureKind::Drag => {
                geometry.position = apply_drag(self.start.position, self.delta());
            }
            GestureKind::Rotate => {
                geometry.rotation = apply_rotation(
                    self.start.position,
                    self.start.rotation,
                    self.start_point,
                    pointer,
                    snap,
                );
            }
            GestureKind::Resize => {
                let (position, size) = apply_resize(
                    self.start.position,
                    self.start.size,
                    self.start.rotation,
                    self.delta(),
                );
                geometry.position = position;
                geometry.size = size;
            }
        }
        geometry
    }
}

/// Translate a card center by a delta.
pub fn apply_drag(start_center: Point, delta: Vec2) -> Point {
    start_center + delta
}

/// Rotation (degrees) after the pointer moved from `start_pointer` to `pointer`
/// around `center`.
pub fn apply_rotation(
    center: Point,
    start_rotation: f64,
    start_pointer: Point,
    pointer: Point,
    snap: bool,
) -> f64 {
    let start = start_pointer - center;
    let current = pointer - center;
    let start_angle = start.y.atan2(start.x);
    let current_angle = current.y.atan2(current.x);

    let rotation = start_rotation + (current_angle - start_angle).to_degrees();
    if snap {
        snap_rotation(rotation)
    } else {
        rotation
    }
}

/// Round a rotation to the nearest snap increment.
pub fn snap_rotation(degrees: f64) -> f64 {
    (degrees / ROTATION_SNAP_DEGREES).round() * ROTATION_SNAP_DEGREES
}

/// Resize from the bottom-right handle, keeping the top-left corner fixed in the
/// card's own frame.
///
/// The global delta is projected into the card's local axes with the negative
/// rotation, the size grows along those axes (each clamped to
/// [`MIN_CARD_SIZE`]), and half of the actual growth is projected back with the
/// positive rotation to move the center.
pub fn apply_resize(
    start_center: Point,
    start_size: Size,
    rotation_degrees: f64,
    delta: Vec2,
) -> (Point, Size) {
    let radians = rotation_degrees.to_radians();
    let local = rotate_vec(delta, -radians);

    let width = (start_size.width + local.x).max(MIN_CARD_SIZE);
    let height = (start_size.height + local.y).max(MIN_CARD_SIZE);

    let local_shift = Vec2::new(
        (width - start_size.width) / 2.0,
        (height - start_size.height) / 2.0,
    );
    let global_shift = rotate_vec(local_shift, radians);

    (start_center + global_shift, Size::new(width, height))
}
