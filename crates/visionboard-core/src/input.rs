//! Input state and pointer binding policy.
//!
//! Cards and the canvas background claim pointer-downs exclusively: a press
//! that lands on a card never pans, and a press on the background never
//! starts a card gesture.

use crate::card::CardId;
use crate::selection::{GestureKind, HandleKind};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Background,
    Card(CardId),
    /// A handle of the selected card.
    Handle(CardId, HandleKind),
}

/// What a pointer-down should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerAction {
    /// Pan the viewport.
    Pan,
    /// Select the card and start a gesture on it.
    Gesture(CardId, GestureKind),
    /// Deselect.
    ClearSelection,
    /// Select the card without starting a gesture (context menu).
    Select(CardId),
    Ignore,
}

/// What a wheel event should do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelAction {
    /// Multiply the scale by this factor around the pointer.
    Zoom(f64),
    /// Pan by this screen delta.
    Pan(Vec2),
}

/// Decide what a pointer-down starts.
pub fn bind_pointer_down(target: &PointerTarget, button: MouseButton, modifiers: Modifiers) -> PointerAction {
    match (target, button) {
        (PointerTarget::Background, MouseButton::Middle) => PointerAction::Pan,
        (PointerTarget::Background, MouseButton::Left) if modifiers.command() || modifiers.alt => PointerAction::Pan,
        (PointerTarget::Background, MouseButton::Left) => PointerAction::ClearSelection,
        (PointerTarget::Background, MouseButton::Right) => PointerAction::Ignore,
        (PointerTarget::Handle(id, handle), MouseButton::Left) => {
            PointerAction::Gesture(id.clone(), GestureKind::from(*handle))
        }
        (PointerTarget::Card(id), MouseButton::Left) => PointerAction::Gesture(id.clone(), GestureKind::Drag),
        (PointerTarget::Card(id) | PointerTarget::Handle(id, _), MouseButton::Right) => {
            PointerAction::Select(id.clone())
        }
        (PointerTarget::Card(_) | PointerTarget::Handle(_, _), MouseButton::Middle) => PointerAction::Ignore,
    }
}

/// Decide what a wheel event does. Zoom needs Ctrl/Cmd; plain scrolling pans.
pub fn bind_wheel(delta: Vec2, modifiers: Modifiers) -> WheelAction {
    if modifiers.command() {
        if delta.y > 0.0 {
            WheelAction::Zoom(1.0 / crate::viewport::ZOOM_STEP)
        } else if delta.y < 0.0 {
            WheelAction::Zoom(crate::viewport::ZOOM_STEP)
        } else {
            WheelAction::Zoom(1.0)
        }
    } else {
        WheelAction::Pan(-delta)
    }
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME_MS: u128 = 500;
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Tracks the current pointer state.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Currently pressed mouse buttons.
    pressed_buttons: HashSet<MouseButton>,
    /// Current modifier keys state.
    pub modifiers: Modifiers,
    /// Last click time for double-click detection.
    last_click_time: Option<Instant>,
    /// Last click position for double-click detection.
    last_click_position: Option<Point>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            pointer_position: Point::ZERO,
            pressed_buttons: HashSet::new(),
            modifiers: Modifiers::default(),
            last_click_time: None,
            last_click_position: None,
        }
    }
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a button press. Returns true if it completes a double-click.
    pub fn press(&mut self, position: Point, button: MouseButton) -> bool {
        self.pointer_position = position;
        self.pressed_buttons.insert(button);
        if button != MouseButton::Left {
            return false;
        }

        let now = Instant::now();
        if let (Some(last_time), Some(last_pos)) = (self.last_click_time, self.last_click_position) {
            let elapsed = now.duration_since(last_time).as_millis();
            let distance = (position - last_pos).hypot();
            if elapsed < DOUBLE_CLICK_TIME_MS && distance < DOUBLE_CLICK_DISTANCE {
                // Reset to prevent triple-click being detected as another double-click
                self.last_click_time = None;
                self.last_click_position = None;
                return true;
            }
        }
        self.last_click_time = Some(now);
        self.last_click_position = Some(position);
        false
    }

    /// Record a button release.
    pub fn release(&mut self, position: Point, button: MouseButton) {
        self.pointer_position = position;
        self.pressed_buttons.remove(&button);
    }

    /// Record pointer movement.
    pub fn moved(&mut self, position: Point) {
        self.pointer_position = position;
    }

    /// Update modifier keys state.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Check if a button is currently pressed.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt() -> Modifiers {
        Modifiers { alt: true, ..Modifiers::NONE }
    }

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, ..Modifiers::NONE }
    }

    #[test]
    fn test_background_bindings() {
        let bg = PointerTarget::Background;
        assert_eq!(bind_pointer_down(&bg, MouseButton::Middle, Modifiers::NONE), PointerAction::Pan);
        assert_eq!(bind_pointer_down(&bg, MouseButton::Left, ctrl()), PointerAction::Pan);
        let meta = Modifiers { meta: true, ..Modifiers::NONE };
        assert_eq!(bind_pointer_down(&bg, MouseButton::Left, meta), PointerAction::Pan);
        assert_eq!(bind_pointer_down(&bg, MouseButton::Left, alt()), PointerAction::Pan);
        assert_eq!(
            bind_pointer_down(&bg, MouseButton::Left, Modifiers::NONE),
            PointerAction::ClearSelection
        );
    }

    #[test]
    fn test_card_press_never_pans() {
        let id = CardId::from("c");
        let card = PointerTarget::Card(id.clone());
        for button in [MouseButton::Left, MouseButton::Middle, MouseButton::Right] {
            for modifiers in [Modifiers::NONE, ctrl(), alt()] {
                assert_ne!(bind_pointer_down(&card, button, modifiers), PointerAction::Pan);
            }
        }
        assert_eq!(
            bind_pointer_down(&card, MouseButton::Left, ctrl()),
            PointerAction::Gesture(id, GestureKind::Drag)
        );
    }

    #[test]
    fn test_handle_bindings() {
        let id = CardId::from("c");
        let rotate = PointerTarget::Handle(id.clone(), HandleKind::Rotate);
        let resize = PointerTarget::Handle(id.clone(), HandleKind::Resize);
        assert_eq!(
            bind_pointer_down(&rotate, MouseButton::Left, Modifiers::NONE),
            PointerAction::Gesture(id.clone(), GestureKind::Rotate)
        );
        assert_eq!(
            bind_pointer_down(&resize, MouseButton::Left, Modifiers::NONE),
            PointerAction::Gesture(id, GestureKind::Resize)
        );
    }

    #[test]
    fn test_wheel_bindings() {
        let ctrl = Modifiers { ctrl: true, ..Modifiers::NONE };
        match bind_wheel(Vec2::new(0.0, -3.0), ctrl) {
            WheelAction::Zoom(factor) => assert!(factor > 1.0),
            other => panic!("expected zoom, got {:?}", other),
        }
        match bind_wheel(Vec2::new(0.0, 3.0), ctrl) {
            WheelAction::Zoom(factor) => assert!(factor < 1.0),
            other => panic!("expected zoom, got {:?}", other),
        }
        assert_eq!(
            bind_wheel(Vec2::new(4.0, 3.0), Modifiers::NONE),
            WheelAction::Pan(Vec2::new(-4.0, -3.0))
        );
    }

    #[test]
    fn test_button_press_release() {
        let mut input = InputState::new();
        input.press(Point::new(100.0, 100.0), MouseButton::Left);
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Right));
        input.release(Point::new(100.0, 100.0), MouseButton::Left);
        assert!(!input.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_double_click_detection() {
        let mut input = InputState::new();
        let pos = Point::new(100.0, 100.0);

        assert!(!input.press(pos, MouseButton::Left));
        input.release(pos, MouseButton::Left);
        assert!(input.press(pos, MouseButton::Left));
        input.release(pos, MouseButton::Left);
        // A third click starts a new sequence.
        assert!(!input.press(pos, MouseButton::Left));
    }

    #[test]
    fn test_double_click_too_far() {
        let mut input = InputState::new();
        assert!(!input.press(Point::new(100.0, 100.0), MouseButton::Left));
        input.release(Point::new(100.0, 100.0), MouseButton::Left);
        assert!(!input.press(Point::new(200.0, 200.0), MouseButton::Left));
    }
}
