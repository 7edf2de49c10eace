//! Pointer interaction on the editing surface.
//!
//! A drag either moves the caption or pans the image; which one is decided
//! once, on pointer-down, by [`hit_test`]. The caption wins wherever the two
//! overlap.
//!
//! ```text
//!            down on text            down on image
//!   Idle ─────────────────► DraggingText    Idle ──────────► DraggingImage
//!    ▲                          │             ▲                   │
//!    └──────── up / leave ──────┘             └──── up / leave ───┘
//! ```
//!
//! While dragging, each move sets the grabbed entity's reference point to
//! `pointer - grab_offset`, so the entity keeps its distance from the pointer
//! instead of jumping to it. Positions are not clamped to the surface.

use crate::imaging::{TextBackend, place};
use crate::stamp::StampItem;
use crate::types::{Point, Rect, SurfaceSize, Vec2};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    DraggingText,
    DraggingImage,
}

/// Drag state plus the grab offset captured at drag start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragSession {
    pub state: DragState,
    pub grab_offset: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    /// The pointer left the surface. Ends a drag like `Up`.
    Leave,
}

/// Cursor hint for the surface. Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Affordance {
    #[default]
    Neutral,
    Grab,
    Grabbing,
}

/// What a pointer-down would grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Text,
    Image,
    Nothing,
}

/// Outcome of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// The active item was mutated and the surface needs a redraw.
    pub changed: bool,
    pub affordance: Affordance,
}

/// The caption's hit box: measured width by font size, centered on the text
/// position. `None` for an empty or unmeasurable caption.
pub fn text_box(item: &StampItem, text: &impl TextBackend) -> Option<Rect> {
    if !item.has_text() {
        return None;
    }
    let width = text.measure(&item.text, &item.font)?;
    Some(Rect::centered(
        item.text_position,
        width as f64,
        item.font.size as f64,
    ))
}

/// Where the image is drawn on the editing surface.
pub fn image_box(item: &StampItem, surface: SurfaceSize) -> Rect {
    place(item.image_size(), surface, &item.transform).rect()
}

pub fn hit_test(
    item: &StampItem,
    surface: SurfaceSize,
    text: &impl TextBackend,
    pointer: Point,
) -> Hit {
    if text_box(item, text).is_some_and(|r| r.contains(pointer)) {
        Hit::Text
    } else if image_box(item, surface).contains(pointer) {
        Hit::Image
    } else {
        Hit::Nothing
    }
}

/// Drives the drag state machine and the zoom/reset controls against a
/// [`Workspace`].
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    session: DragSession,
    affordance: Affordance,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> DragSession {
        self.session
    }

    pub fn state(&self) -> DragState {
        self.session.state
    }

    pub fn is_dragging(&self) -> bool {
        self.session.state != DragState::Idle
    }

    pub fn affordance(&self) -> Affordance {
        self.affordance
    }

    pub fn handle(
        &mut self,
        ws: &mut Workspace,
        text: &impl TextBackend,
        event: PointerEvent,
    ) -> Response {
        let changed = match event {
            PointerEvent::Down(p) => {
                self.pointer_down(ws, text, p);
                false
            }
            PointerEvent::Move(p) => self.pointer_move(ws, p),
            PointerEvent::Up(p) => {
                self.release();
                self.hover(ws, p);
                false
            }
            PointerEvent::Leave => {
                self.release();
                self.affordance = Affordance::Neutral;
                false
            }
        };
        Response {
            changed,
            affordance: self.affordance,
        }
    }

    /// Abandon any drag without touching the workspace, e.g. when the active
    /// item changes underneath it.
    pub fn cancel(&mut self) {
        self.release();
        self.affordance = Affordance::Neutral;
    }

    /// Zoom slider: absolute scale, anchored at the image's own center.
    pub fn zoom(&mut self, ws: &mut Workspace, scale: f64) -> bool {
        if !(scale.is_finite() && scale > 0.0) {
            log::debug!("ignoring zoom to {scale}");
            return false;
        }
        let Some(current) = ws.active_item().map(|item| item.transform) else {
            return false;
        };
        let zoomed = current.zoomed(scale);
        ws.update_active_transform(Some(zoomed.scale), Some(zoomed.offset))
    }

    /// Reset control: back to the load-time fit.
    pub fn reset(&mut self, ws: &mut Workspace) -> bool {
        ws.reset_active_transform()
    }

    fn pointer_down(&mut self, ws: &Workspace, text: &impl TextBackend, pointer: Point) {
        self.release();
        let Some(item) = ws.active_item() else {
            return;
        };
        match hit_test(item, ws.surface(), text, pointer) {
            Hit::Text => {
                self.session = DragSession {
                    state: DragState::DraggingText,
                    grab_offset: pointer - item.text_position,
                };
            }
            Hit::Image => {
                self.session = DragSession {
                    state: DragState::DraggingImage,
                    grab_offset: pointer - item.transform.offset.to_point(),
                };
            }
            Hit::Nothing => return,
        }
        self.affordance = Affordance::Grabbing;
        log::debug!("drag start {:?} at {pointer:?}", self.session.state);
    }

    fn pointer_move(&mut self, ws: &mut Workspace, pointer: Point) -> bool {
        let target = pointer - self.session.grab_offset;
        match self.session.state {
            DragState::Idle => {
                self.hover(ws, pointer);
                false
            }
            DragState::DraggingText => ws.move_active_text(target),
            DragState::DraggingImage => {
                ws.update_active_transform(None, Some(Vec2::new(target.x, target.y)))
            }
        }
    }

    fn hover(&mut self, ws: &Workspace, pointer: Point) {
        self.affordance = match ws.active_item() {
            Some(item) if image_box(item, ws.surface()).contains(pointer) => Affordance::Grab,
            _ => Affordance::Neutral,
        };
    }

    fn release(&mut self) {
        if self.is_dragging() {
            log::debug!("drag end {:?}", self.session.state);
        }
        self.session = DragSession::default();
    }
}
