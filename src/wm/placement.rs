//! Placement Module
//!
//! Geometry policy for frames: initial centering, fullscreen toggle, and
//! directional snapping. Everything here is pure; the dispatcher applies the
//! returned layouts to the server.

use crate::shared::Geometry;
use crate::wm::client::Client;

/// Height of the frame titlebar
pub const TITLE_HEIGHT: u32 = 26;
/// Height of the per-monitor status bar
pub const BAR_HEIGHT: u32 = 26;
/// Below this, a requested size is replaced by the default
pub const MIN_SIZE: u32 = 60;
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 500;

/// Target geometry for a frame plus the size its client must take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub frame: Geometry,
    pub client_width: u32,
    pub client_height: u32,
}

impl FrameLayout {
    /// Layout where the client fills the frame below the titlebar
    pub fn decorated(frame: Geometry) -> Self {
        Self {
            frame,
            client_width: frame.width.max(1),
            client_height: frame.height.saturating_sub(TITLE_HEIGHT).max(1),
        }
    }

    /// Layout where the client covers the whole frame
    pub fn bare(frame: Geometry) -> Self {
        Self {
            frame,
            client_width: frame.width.max(1),
            client_height: frame.height.max(1),
        }
    }
}

/// Result of placing a newly mapped window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialPlacement {
    /// Frame rectangle (client size plus titlebar)
    pub frame: Geometry,
    pub client_width: u32,
    pub client_height: u32,
    /// True when the requested size was replaced by the default and the
    /// client itself must be resized
    pub resized: bool,
}

/// Directional snap targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapDirection {
    Left,
    Right,
    Maximize,
    Restore,
}

/// Center a window of the requested size in `usable`, never above its top
pub fn initial_placement(usable: Geometry, width: u32, height: u32) -> InitialPlacement {
    let (width, height, resized) = if width < MIN_SIZE || height < MIN_SIZE {
        (DEFAULT_WIDTH, DEFAULT_HEIGHT, true)
    } else {
        (width, height, false)
    };

    let x = usable.x + (usable.width as i32 - width as i32) / 2;
    let y = (usable.y + (usable.height as i32 - height as i32) / 2).max(usable.y);

    InitialPlacement {
        frame: Geometry::new(x, y, width, height + TITLE_HEIGHT),
        client_width: width,
        client_height: height,
        resized,
    }
}

/// Flip a client in or out of fullscreen.
///
/// `current` is the frame's geometry right now and `monitor` the full
/// rectangle of the owning monitor (the status bar is covered too).
pub fn toggle_fullscreen(client: &mut Client, current: Geometry, monitor: Geometry) -> FrameLayout {
    if client.fullscreen {
        client.fullscreen = false;
        FrameLayout::decorated(client.saved_geometry.unwrap_or(current))
    } else {
        client.saved_geometry = Some(current);
        client.fullscreen = true;
        FrameLayout::bare(monitor)
    }
}

/// Compute a snap target inside `usable`.
///
/// Returns `None` when nothing should change: the client is fullscreen, or a
/// restore is asked for with no saved geometry. Left, right and maximize save
/// `current` first; restore leaves the saved slot untouched.
pub fn snap(
    client: &mut Client,
    current: Geometry,
    usable: Geometry,
    direction: SnapDirection,
) -> Option<FrameLayout> {
    if client.fullscreen {
        return None;
    }

    let half = usable.width / 2;
    let target = match direction {
        SnapDirection::Left => Geometry::new(usable.x, usable.y, half, usable.height),
        SnapDirection::Right => Geometry::new(usable.x + half as i32, usable.y, half, usable.height),
        SnapDirection::Maximize => usable,
        SnapDirection::Restore => return client.saved_geometry.map(FrameLayout::decorated),
    };

    client.saved_geometry = Some(current);
    Some(FrameLayout::decorated(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usable() -> Geometry {
        Geometry::new(0, BAR_HEIGHT as i32, 1920, 1080 - BAR_HEIGHT)
    }

    #[test]
    fn test_initial_placement_centers_in_usable_area() {
        let placed = initial_placement(usable(), 800, 500);
        assert!(!placed.resized);
        assert_eq!(placed.frame.x, 560);
        assert_eq!(placed.frame.y, 26 + (1080 - 26 - 500) / 2);
        assert_eq!(placed.frame.width, 800);
        assert_eq!(placed.frame.height, 500 + TITLE_HEIGHT);
    }

    #[test]
    fn test_tiny_window_gets_default_size() {
        let placed = initial_placement(usable(), 10, 10);
        assert!(placed.resized);
        assert_eq!((placed.client_width, placed.client_height), (800, 500));

        // Only one dimension below the minimum is enough
        let placed = initial_placement(usable(), 1000, 59);
        assert!(placed.resized);
        assert_eq!(placed.client_width, DEFAULT_WIDTH);
    }

    #[test]
    fn test_tall_window_never_above_usable_top() {
        let placed = initial_placement(usable(), 400, 2000);
        assert_eq!(placed.frame.y, BAR_HEIGHT as i32);
    }

    #[test]
    fn test_fullscreen_round_trip() {
        let mut client = Client::new(1, Some(2), 0);
        let original = Geometry::new(300, 200, 640, 480);
        let monitor = Geometry::new(0, 0, 1920, 1080);

        let enter = toggle_fullscreen(&mut client, original, monitor);
        assert!(client.fullscreen);
        assert_eq!(enter.frame, monitor);
        assert_eq!((enter.client_width, enter.client_height), (1920, 1080));

        let exit = toggle_fullscreen(&mut client, enter.frame, monitor);
        assert!(!client.fullscreen);
        assert_eq!(exit.frame, original);
        assert_eq!(exit.client_height, 480 - TITLE_HEIGHT);
    }

    #[test]
    fn test_snap_left_then_restore() {
        let mut client = Client::new(1, Some(2), 0);
        let original = Geometry::new(100, 100, 500, 400);

        let left = snap(&mut client, original, usable(), SnapDirection::Left).unwrap();
        assert_eq!(left.frame, Geometry::new(0, 26, 960, 1054));
        assert_eq!(left.client_height, 1054 - TITLE_HEIGHT);

        let restored = snap(&mut client, left.frame, usable(), SnapDirection::Restore).unwrap();
        assert_eq!(restored.frame, original);

        // Restore is stable when repeated
        let again = snap(&mut client, restored.frame, usable(), SnapDirection::Restore).unwrap();
        assert_eq!(again.frame, original);
    }

    #[test]
    fn test_snap_right_and_maximize() {
        let mut client = Client::new(1, Some(2), 0);
        let start = Geometry::new(10, 40, 300, 300);

        let right = snap(&mut client, start, usable(), SnapDirection::Right).unwrap();
        assert_eq!(right.frame, Geometry::new(960, 26, 960, 1054));

        let max = snap(&mut client, right.frame, usable(), SnapDirection::Maximize).unwrap();
        assert_eq!(max.frame, usable());
        assert_eq!(client.saved_geometry, Some(right.frame));
    }

    #[test]
    fn test_snap_is_noop_while_fullscreen() {
        let mut client = Client::new(1, Some(2), 0);
        let original = Geometry::new(50, 60, 700, 500);
        let monitor = Geometry::new(0, 0, 1920, 1080);
        toggle_fullscreen(&mut client, original, monitor);

        for dir in [
            SnapDirection::Left,
            SnapDirection::Right,
            SnapDirection::Maximize,
            SnapDirection::Restore,
        ] {
            assert_eq!(snap(&mut client, monitor, usable(), dir), None);
        }
        assert_eq!(client.saved_geometry, Some(original));
    }

    #[test]
    fn test_restore_without_saved_geometry() {
        let mut client = Client::new(1, Some(2), 0);
        let current = Geometry::new(0, 0, 100, 100);
        assert_eq!(snap(&mut client, current, usable(), SnapDirection::Restore), None);
    }
}
