//! Plain window state shared between the registry, layout policy, and the
//! interactive controllers.

use x11rb::protocol::xproto::MapState;

/// Window geometry in root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Center point, using integer halving like the server does
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + self.width as i32 / 2,
            self.y + self.height as i32 / 2,
        )
    }

    /// Half-open containment test: the right and bottom edges are outside
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }
}

/// Whether a top-level window is currently on screen, as reported by the
/// server's map state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Mapped and viewable
    Visible,
    /// Unmapped (hidden by the user)
    Hidden,
    /// Mapped but not viewable
    Unviewable,
}

impl From<MapState> for Visibility {
    fn from(state: MapState) -> Self {
        match state {
            MapState::VIEWABLE => Visibility::Visible,
            MapState::UNMAPPED => Visibility::Hidden,
            _ => Visibility::Unviewable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_rounds_down() {
        let geom = Geometry::new(10, 20, 101, 51);
        assert_eq!(geom.center(), (60, 45));
    }

    #[test]
    fn test_contains_is_half_open() {
        let geom = Geometry::new(0, 0, 1920, 1080);
        assert!(geom.contains(0, 0));
        assert!(geom.contains(1919, 1079));
        assert!(!geom.contains(1920, 0));
        assert!(!geom.contains(0, 1080));
        assert!(!geom.contains(-1, 5));
    }

    #[test]
    fn test_visibility_from_map_state() {
        assert_eq!(Visibility::from(MapState::VIEWABLE), Visibility::Visible);
        assert_eq!(Visibility::from(MapState::UNMAPPED), Visibility::Hidden);
        assert_eq!(Visibility::from(MapState::UNVIEWABLE), Visibility::Unviewable);
    }
}
