//! Editing session state: the board, the view onto it, and what the pointer is doing.

use crate::board::{BoardDocument, BoardSettings};
use crate::card::{Card, CardContent, CardId, CardStyle};
use crate::input::{
    InputState, Modifiers, MouseButton, PointerAction, PointerTarget, WheelAction, bind_pointer_down,
    bind_wheel,
};
use crate::selection::{GestureSession, HANDLE_HIT_TOLERANCE, Handle, get_handles, hit_test_handles};
use crate::viewport::Viewport;
use kurbo::{Point, Vec2};

/// A viewport pan in progress, tracked from where it started.
#[derive(Debug, Clone, Copy)]
struct PanSession {
    start_pointer: Point,
    start_offset: Vec2,
}

/// Everything one editing surface needs.
///
/// Card data changes only through the methods here. Each change bumps
/// [`revision`](Self::revision); pan and zoom never do.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    document: BoardDocument,
    viewport: Viewport,
    selection: Option<CardId>,
    gesture: Option<GestureSession>,
    pan: Option<PanSession>,
    input: InputState,
    revision: u64,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: BoardDocument) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    pub fn document(&self) -> &BoardDocument {
        &self.document
    }

    pub fn cards(&self) -> &[Card] {
        self.document.cards()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable access to pan/zoom. Does not count as a board change.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn selection(&self) -> Option<&CardId> {
        self.selection.as_ref()
    }

    pub fn selected_card(&self) -> Option<&Card> {
        self.selection.as_ref().and_then(|id| self.document.get_card(id))
    }

    /// Handles of the selected card, in canvas coordinates.
    pub fn selected_handles(&self) -> Option<[Handle; 2]> {
        self.selected_card().map(get_handles)
    }

    pub fn gesture(&self) -> Option<&GestureSession> {
        self.gesture.as_ref()
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    /// Monotonic counter of board mutations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Add a card centered at `at` (canvas coordinates), or in the middle of the
    /// current view. The new card is selected.
    pub fn add_card(&mut self, mut card: Card, at: Option<Point>) -> CardId {
        card.position = at.unwrap_or_else(|| self.viewport.center_in_canvas());
        let id = self.document.add_card(card);
        self.selection = Some(id.clone());
        self.touch();
        log::debug!("Added card {}", id);
        id
    }

    /// Add a card under a screen point, e.g. where a context menu was opened.
    pub fn add_card_at_screen(&mut self, card: Card, screen_point: Point) -> CardId {
        let at = self.viewport.screen_to_canvas(screen_point);
        self.add_card(card, Some(at))
    }

    /// Apply `update` to a card. Returns false if there is no such card.
    pub fn update_card(&mut self, id: &CardId, update: impl FnOnce(&mut Card)) -> bool {
        let updated = self.document.update_card(id, update);
        if updated {
            self.touch();
        }
        updated
    }

    pub fn delete_card(&mut self, id: &CardId) -> Option<Card> {
        let removed = self.document.remove_card(id)?;
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        if self.gesture.as_ref().is_some_and(|g| &g.card_id == id) {
            self.gesture = None;
        }
        self.touch();
        Some(removed)
    }

    /// Flip a card to its other face. Text cards stay as they are.
    pub fn toggle_flip(&mut self, id: &CardId) -> bool {
        let flipped = self
            .document
            .get_card_mut(id)
            .map(Card::flip)
            .unwrap_or(false);
        if flipped {
            self.touch();
        }
        flipped
    }

    pub fn set_style(&mut self, id: &CardId, style: CardStyle) -> bool {
        self.update_card(id, |card| card.content.style = style)
    }

    pub fn set_content(&mut self, id: &CardId, content: CardContent) -> bool {
        self.update_card(id, |card| card.content = content)
    }

    /// Select a card and bring it to the front.
    pub fn select(&mut self, id: &CardId) -> bool {
        if self.document.get_card(id).is_none() {
            return false;
        }
        self.selection = Some(id.clone());
        if self.document.bring_to_front(id) {
            self.touch();
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Replace all cards, e.g. after loading or restoring history.
    pub fn replace_cards(&mut self, cards: Vec<Card>) {
        self.document.replace_cards(cards);
        self.reset_interaction();
        self.touch();
    }

    /// Replace the whole document.
    pub fn load_document(&mut self, document: BoardDocument) {
        self.document = document;
        self.reset_interaction();
        self.touch();
    }

    pub fn set_settings(&mut self, settings: BoardSettings) {
        if self.document.settings != settings {
            self.document.settings = settings;
            self.touch();
        }
    }

    fn reset_interaction(&mut self) {
        self.selection = None;
        self.gesture = None;
        self.pan = None;
    }

    /// What sits under a canvas point. Handles of the selected card win over
    /// card bodies; card bodies are tested front to back.
    pub fn hit_test(&self, canvas_point: Point) -> PointerTarget {
        if let Some(card) = self.selected_card() {
            let tolerance = HANDLE_HIT_TOLERANCE / self.viewport.scale();
            if let Some(handle) = hit_test_handles(card, canvas_point, tolerance) {
                return PointerTarget::Handle(card.id.clone(), handle);
            }
        }
        match self.document.card_at_point(canvas_point) {
            Some(card) => PointerTarget::Card(card.id.clone()),
            None => PointerTarget::Background,
        }
    }

    /// Handle a button press at a screen point.
    pub fn pointer_down(&mut self, screen_point: Point, button: MouseButton, modifiers: Modifiers) -> PointerAction {
        self.input.set_modifiers(modifiers);
        let double_click = self.input.press(screen_point, button);
        let canvas_point = self.viewport.screen_to_canvas(screen_point);
        let target = self.hit_test(canvas_point);
        let action = bind_pointer_down(&target, button, modifiers);

        match &action {
            PointerAction::Pan => {
                self.pan = Some(PanSession {
                    start_pointer: screen_point,
                    start_offset: self.viewport.offset,
                });
            }
            PointerAction::Gesture(id, kind) => {
                self.select(id);
                self.gesture = self
                    .document
                    .get_card(id)
                    .map(|card| GestureSession::begin(*kind, card, canvas_point));
            }
            PointerAction::ClearSelection => self.clear_selection(),
            PointerAction::Select(id) => {
                self.select(id);
            }
            PointerAction::Ignore => {}
        }

        if double_click {
            if let PointerTarget::Card(id) = &target {
                self.toggle_flip(id);
            }
        }
        action
    }

    /// Handle pointer movement. Returns true if the board or view changed.
    pub fn pointer_move(&mut self, screen_point: Point, modifiers: Modifiers) -> bool {
        self.input.set_modifiers(modifiers);
        self.input.moved(screen_point);

        if let Some(pan) = self.pan {
            let target = pan.start_offset + (screen_point - pan.start_pointer);
            self.viewport.pan(target - self.viewport.offset);
            return true;
        }

        let canvas_point = self.viewport.screen_to_canvas(screen_point);
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        let geometry = gesture.update(canvas_point, modifiers.shift);
        let id = gesture.card_id.clone();
        self.update_card(&id, |card| geometry.apply_to(card))
    }

    /// Handle a button release. Ends any pan or gesture.
    pub fn pointer_up(&mut self, screen_point: Point, button: MouseButton) {
        self.input.release(screen_point, button);
        self.gesture = None;
        self.pan = None;
    }

    /// Handle a wheel event at a screen point.
    pub fn wheel(&mut self, screen_point: Point, delta: Vec2, modifiers: Modifiers) {
        match bind_wheel(delta, modifiers) {
            WheelAction::Zoom(factor) => self.viewport.zoom(factor, Some(screen_point)),
            WheelAction::Pan(delta) => self.viewport.pan(delta),
        }
    }
}
