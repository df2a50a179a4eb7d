//! MoveResize Module
//!
//! Interactive window moving and resizing driven by pointer motion while a
//! button is held. The state machine is pure; grabbing the pointer and
//! applying geometry is done by the dispatcher.

use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;
use crate::wm::placement::{MIN_SIZE, TITLE_HEIGHT};

/// What the held button does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Origin follows the pointer
    Move,
    /// Edges follow the pointer. Each direction is +1 when the grab landed
    /// past the window center on that axis (the far edge moves), -1 otherwise
    /// (the near edge moves and the far edge stays put).
    Resize { x_dir: i32, y_dir: i32 },
}

/// Snapshot taken when the drag starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
    /// Frame being dragged
    pub frame: Window,
    /// Pointer position at grab time (root coordinates)
    pub start_x: i32,
    pub start_y: i32,
    /// Frame geometry at grab time
    pub start: Geometry,
    pub mode: DragMode,
}

impl DragState {
    pub fn begin_move(frame: Window, root_x: i32, root_y: i32, start: Geometry) -> Self {
        Self {
            frame,
            start_x: root_x,
            start_y: root_y,
            start,
            mode: DragMode::Move,
        }
    }

    /// Start a resize; the quadrant is fixed here for the whole drag
    pub fn begin_resize(frame: Window, root_x: i32, root_y: i32, start: Geometry) -> Self {
        let (cx, cy) = start.center();
        Self {
            frame,
            start_x: root_x,
            start_y: root_y,
            start,
            mode: DragMode::Resize {
                x_dir: if root_x > cx { 1 } else { -1 },
                y_dir: if root_y > cy { 1 } else { -1 },
            },
        }
    }

    /// Frame geometry for the pointer at (`root_x`, `root_y`)
    pub fn motion(&self, root_x: i32, root_y: i32) -> Geometry {
        let dx = root_x - self.start_x;
        let dy = root_y - self.start_y;
        let start = self.start;

        match self.mode {
            DragMode::Move => Geometry {
                x: start.x + dx,
                y: (start.y + dy).max(0),
                ..start
            },
            DragMode::Resize { x_dir, y_dir } => {
                let min_w = MIN_SIZE as i32;
                let min_h = (MIN_SIZE + TITLE_HEIGHT) as i32;

                let (mut x, mut w) = resize_axis(start.x, start.width as i32, dx, x_dir);
                let (mut y, mut h) = resize_axis(start.y, start.height as i32, dy, y_dir);

                if w < min_w {
                    w = min_w;
                    if x_dir < 0 {
                        x = start.x + start.width as i32 - min_w;
                    }
                }
                if h < min_h {
                    h = min_h;
                    if y_dir < 0 {
                        y = start.y + start.height as i32 - min_h;
                    }
                }

                Geometry::new(x, y, w as u32, h as u32)
            }
        }
    }

    pub fn is_resize(&self) -> bool {
        matches!(self.mode, DragMode::Resize { .. })
    }
}

fn resize_axis(origin: i32, size: i32, delta: i32, dir: i32) -> (i32, i32) {
    if dir > 0 {
        (origin, size + delta)
    } else {
        (origin + delta, size - delta)
    }
}

/// Pointer interaction state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging(DragState),
}

impl Interaction {
    pub fn drag(&self) -> Option<&DragState> {
        match self {
            Interaction::Idle => None,
            Interaction::Dragging(state) => Some(state),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, Interaction::Dragging(_))
    }

    /// The switcher and menu take over input, so they stay closed while a
    /// drag owns the pointer and its release is still pending
    pub fn allows_overlay(&self) -> bool {
        !self.is_dragging()
    }

    /// Leave the dragging state, returning the finished drag if there was one
    pub fn finish(&mut self) -> Option<DragState> {
        match std::mem::take(self) {
            Interaction::Idle => None,
            Interaction::Dragging(state) => Some(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_applies_pointer_delta() {
        let drag = DragState::begin_move(9, 50, 50, Geometry::new(100, 100, 400, 300));
        let geom = drag.motion(30, 70);
        assert_eq!(geom, Geometry::new(80, 120, 400, 300));
    }

    #[test]
    fn test_move_clamps_to_screen_top() {
        let drag = DragState::begin_move(9, 50, 50, Geometry::new(100, 10, 400, 300));
        let geom = drag.motion(50, 0);
        assert_eq!(geom.y, 0);
        // x is not clamped
        assert_eq!(drag.motion(-200, 50).x, -150);
    }

    #[test]
    fn test_resize_bottom_right_clamps_width() {
        let start = Geometry::new(0, 0, 200, 200);
        let drag = DragState::begin_resize(9, 190, 190, start);
        assert_eq!(drag.mode, DragMode::Resize { x_dir: 1, y_dir: 1 });

        let geom = drag.motion(190 - 250, 190);
        assert_eq!(geom.width, MIN_SIZE);
        assert_eq!(geom.x, 0);
        assert_eq!(geom.height, 200);
    }

    #[test]
    fn test_resize_top_left_keeps_opposite_edges() {
        let start = Geometry::new(100, 100, 300, 300);
        let drag = DragState::begin_resize(9, 110, 110, start);
        assert_eq!(drag.mode, DragMode::Resize { x_dir: -1, y_dir: -1 });

        // Grow up and left
        let geom = drag.motion(60, 80);
        assert_eq!(geom, Geometry::new(50, 70, 350, 330));

        // Shrink past the floor: right and bottom edges stay where they were
        let geom = drag.motion(600, 600);
        assert_eq!(geom.width, MIN_SIZE);
        assert_eq!(geom.height, MIN_SIZE + TITLE_HEIGHT);
        assert_eq!(geom.x + geom.width as i32, 400);
        assert_eq!(geom.y + geom.height as i32, 400);
    }

    #[test]
    fn test_resize_quadrant_fixed_at_grab() {
        let start = Geometry::new(0, 0, 200, 200);
        // Exactly on the center counts as the near side
        let drag = DragState::begin_resize(9, 100, 150, start);
        assert_eq!(drag.mode, DragMode::Resize { x_dir: -1, y_dir: 1 });

        // Crossing the center later does not flip the quadrant
        let geom = drag.motion(20, 150);
        assert_eq!(geom.x, -80);
        assert_eq!(geom.width, 280);
    }

    #[test]
    fn test_interaction_finish() {
        let mut interaction = Interaction::Idle;
        assert!(interaction.finish().is_none());

        let drag = DragState::begin_move(4, 0, 0, Geometry::default());
        interaction = Interaction::Dragging(drag);
        assert!(interaction.is_dragging());
        assert_eq!(interaction.drag().map(|d| d.frame), Some(4));
        assert_eq!(interaction.finish(), Some(drag));
        assert_eq!(interaction, Interaction::Idle);
    }

    #[test]
    fn test_overlays_wait_for_drag_release() {
        let mut interaction = Interaction::default();
        assert!(interaction.allows_overlay());

        interaction = Interaction::Dragging(DragState::begin_move(
            5,
            10,
            10,
            Geometry::new(0, 0, 100, 100),
        ));
        assert!(!interaction.allows_overlay());

        interaction.finish();
        assert!(interaction.allows_overlay());
    }
}
