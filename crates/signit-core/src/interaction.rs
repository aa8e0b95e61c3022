//! Pointer-driven drag and resize
//!
//! One [`InteractionController`] owns the pointer state for a rendered page.
//! At most one overlay is being dragged or resized at any time; the only way
//! in or out of a pointer session is through the `begin_*` and `end`
//! transitions. All positions are screen pixels relative to the top-left of
//! the rendered page.

use crate::config::LimitsConfig;
use crate::coords::ScreenRect;
use crate::overlay::{OverlayId, OverlayStore};

/// Pointer position on the rendered page surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered size of the current page, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerState {
    #[default]
    Idle,
    Dragging {
        id: OverlayId,
        /// Pointer offset from the overlay's top-left at press time
        offset_x: f64,
        offset_y: f64,
    },
    Resizing {
        id: OverlayId,
        start_x: f64,
        start_y: f64,
        start_w: f64,
        start_h: f64,
    },
}

/// Top-left for a drag, keeping the whole box on the surface.
///
/// A box larger than the surface is pinned to the top-left edge.
pub fn clamp_drag(
    rect: &ScreenRect,
    pointer: Point,
    offset: Point,
    surface: SurfaceSize,
) -> Point {
    let max_x = (surface.width - rect.w).max(0.0);
    let max_y = (surface.height - rect.h).max(0.0);
    Point {
        x: (pointer.x - offset.x).min(max_x).max(0.0),
        y: (pointer.y - offset.y).min(max_y).max(0.0),
    }
}

/// Size for a resize, floored at the minimum on each axis
pub fn clamp_resize(
    start_w: f64,
    start_h: f64,
    dx: f64,
    dy: f64,
    limits: &LimitsConfig,
) -> (f64, f64) {
    (
        (start_w + dx).max(limits.min_width),
        (start_h + dy).max(limits.min_height),
    )
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    state: PointerState,
    limits: LimitsConfig,
}

impl InteractionController {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            state: PointerState::Idle,
            limits,
        }
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == PointerState::Idle
    }

    /// Overlay currently held by a drag or resize
    pub fn active_overlay(&self) -> Option<OverlayId> {
        match self.state {
            PointerState::Idle => None,
            PointerState::Dragging { id, .. } | PointerState::Resizing { id, .. } => Some(id),
        }
    }

    /// Start dragging `id`. Returns false if another pointer session is
    /// active or the overlay does not exist.
    pub fn begin_drag(&mut self, store: &OverlayStore, id: OverlayId, pointer: Point) -> bool {
        if !self.is_idle() {
            tracing::debug!(%id, state = ?self.state, "Pointer already captured");
            return false;
        }
        let Some(overlay) = store.find(id) else {
            return false;
        };
        self.state = PointerState::Dragging {
            id,
            offset_x: pointer.x - overlay.x,
            offset_y: pointer.y - overlay.y,
        };
        true
    }

    /// Move the dragged overlay so the captured offset stays under the
    /// pointer. Returns false if no drag is active or the overlay is gone.
    pub fn drag_to(
        &mut self,
        store: &mut OverlayStore,
        pointer: Point,
        surface: SurfaceSize,
    ) -> bool {
        let PointerState::Dragging {
            id,
            offset_x,
            offset_y,
        } = self.state
        else {
            return false;
        };

        let moved = store.update(id, |overlay| {
            let position = clamp_drag(
                &overlay.rect(),
                pointer,
                Point::new(offset_x, offset_y),
                surface,
            );
            overlay.x = position.x;
            overlay.y = position.y;
        });
        if !moved {
            // Deleted mid-drag
            self.state = PointerState::Idle;
        }
        moved
    }

    /// Start resizing `id` from its bottom-right handle
    pub fn begin_resize(&mut self, store: &OverlayStore, id: OverlayId, pointer: Point) -> bool {
        if !self.is_idle() {
            tracing::debug!(%id, state = ?self.state, "Pointer already captured");
            return false;
        }
        let Some(overlay) = store.find(id) else {
            return false;
        };
        self.state = PointerState::Resizing {
            id,
            start_x: pointer.x,
            start_y: pointer.y,
            start_w: overlay.w,
            start_h: overlay.h,
        };
        true
    }

    /// Grow or shrink from the fixed top-left corner
    pub fn resize_to(&mut self, store: &mut OverlayStore, pointer: Point) -> bool {
        let PointerState::Resizing {
            id,
            start_x,
            start_y,
            start_w,
            start_h,
        } = self.state
        else {
            return false;
        };

        let (w, h) = clamp_resize(
            start_w,
            start_h,
            pointer.x - start_x,
            pointer.y - start_y,
            &self.limits,
        );
        let resized = store.update(id, |overlay| {
            overlay.w = w;
            overlay.h = h;
        });
        if !resized {
            self.state = PointerState::Idle;
        }
        resized
    }

    /// Release the pointer. Returns the overlay that was held, if any.
    pub fn end(&mut self) -> Option<OverlayId> {
        let released = self.active_overlay();
        self.state = PointerState::Idle;
        released
    }
}
