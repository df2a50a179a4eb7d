//! Screen Module
//!
//! The monitor set: physical display regions detected once at startup and the
//! geometry queries the rest of the manager needs (monitor at a point, usable
//! area below the status bar, bar window lookups).

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Screen, Window};

use crate::shared::Geometry;

/// Upper bound on tracked monitors
pub const MAX_MONITORS: usize = 8;

/// A physical display region plus its status bar window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub geometry: Geometry,
    pub bar: Option<Window>,
}

impl Monitor {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, bar: None }
    }
}

/// All detected monitors, never empty
#[derive(Debug, Clone)]
pub struct MonitorSet {
    monitors: Vec<Monitor>,
}

impl MonitorSet {
    /// Build a set from explicit rectangles, falling back to `fallback` when
    /// `rects` is empty. Extra rectangles past [`MAX_MONITORS`] are dropped.
    pub fn from_rects(rects: &[Geometry], fallback: Geometry) -> Self {
        let mut monitors: Vec<Monitor> = rects
            .iter()
            .take(MAX_MONITORS)
            .copied()
            .map(Monitor::new)
            .collect();

        if monitors.is_empty() {
            monitors.push(Monitor::new(fallback));
        }

        Self { monitors }
    }

    /// Query the server's multi-head layout (RandR monitors), falling back to
    /// a single monitor covering the whole screen
    pub fn detect<C: Connection>(conn: &C, screen: &Screen) -> Self {
        let whole = Geometry::new(
            0,
            0,
            screen.width_in_pixels as u32,
            screen.height_in_pixels as u32,
        );

        let rects = match query_randr_monitors(conn, screen.root) {
            Ok(rects) => rects,
            Err(e) => {
                warn!("Monitor query failed ({}), using whole screen", e);
                Vec::new()
            }
        };

        let set = Self::from_rects(&rects, whole);
        info!("Detected {} monitor(s)", set.len());
        for (i, mon) in set.iter().enumerate() {
            debug!("  monitor {}: {:?}", i, mon.geometry);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Monitor> {
        self.monitors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Monitor> {
        self.monitors.iter_mut()
    }

    /// Index of the monitor containing the point, or 0 when none does
    pub fn monitor_at(&self, x: i32, y: i32) -> usize {
        self.monitors
            .iter()
            .position(|m| m.geometry.contains(x, y))
            .unwrap_or(0)
    }

    /// Monitor at `index`, or the first monitor when out of range
    pub fn get(&self, index: usize) -> &Monitor {
        self.monitors.get(index).unwrap_or(&self.monitors[0])
    }

    /// Monitor rectangle minus the status bar strip at the top
    pub fn usable_area(&self, index: usize, bar_height: u32) -> Geometry {
        let mon = self.get(index).geometry;
        Geometry {
            x: mon.x,
            y: mon.y + bar_height as i32,
            width: mon.width,
            height: mon.height.saturating_sub(bar_height),
        }
    }

    /// Index of the monitor owning this bar window
    pub fn bar_index(&self, window: Window) -> Option<usize> {
        self.monitors.iter().position(|m| m.bar == Some(window))
    }

    pub fn is_bar(&self, window: Window) -> bool {
        self.bar_index(window).is_some()
    }

    pub fn bars(&self) -> Vec<Window> {
        self.monitors.iter().filter_map(|m| m.bar).collect()
    }
}

fn query_randr_monitors<C: Connection>(conn: &C, root: Window) -> Result<Vec<Geometry>> {
    if conn
        .extension_information(randr::X11_EXTENSION_NAME)?
        .is_none()
    {
        debug!("RandR not available");
        return Ok(Vec::new());
    }

    let version = conn.randr_query_version(1, 5)?.reply()?;
    if (version.major_version, version.minor_version) < (1, 5) {
        debug!(
            "RandR {}.{} has no monitor query",
            version.major_version, version.minor_version
        );
        return Ok(Vec::new());
    }

    let reply = conn.randr_get_monitors(root, true)?.reply()?;
    Ok(reply
        .monitors
        .iter()
        .filter(|m| m.width > 0 && m.height > 0)
        .map(|m| Geometry::new(m.x as i32, m.y as i32, m.width as u32, m.height as u32))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual() -> MonitorSet {
        MonitorSet::from_rects(
            &[
                Geometry::new(0, 0, 1920, 1080),
                Geometry::new(1920, 0, 1280, 1024),
            ],
            Geometry::new(0, 0, 3200, 1080),
        )
    }

    #[test]
    fn test_empty_query_falls_back_to_whole_screen() {
        let set = MonitorSet::from_rects(&[], Geometry::new(0, 0, 1024, 768));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).geometry, Geometry::new(0, 0, 1024, 768));
    }

    #[test]
    fn test_monitor_at_point() {
        let set = dual();
        assert_eq!(set.monitor_at(100, 100), 0);
        assert_eq!(set.monitor_at(1920, 10), 1);
        assert_eq!(set.monitor_at(3000, 1000), 1);
        // Outside every monitor
        assert_eq!(set.monitor_at(3000, 1050), 0);
        assert_eq!(set.monitor_at(-5, -5), 0);
    }

    #[test]
    fn test_usable_area_subtracts_bar() {
        let set = dual();
        assert_eq!(set.usable_area(1, 26), Geometry::new(1920, 26, 1280, 998));
        // Out-of-range index resolves to the first monitor
        assert_eq!(set.usable_area(7, 26), Geometry::new(0, 26, 1920, 1054));
    }

    #[test]
    fn test_monitor_count_is_capped() {
        let rects: Vec<Geometry> = (0..12)
            .map(|i| Geometry::new(i * 100, 0, 100, 100))
            .collect();
        let set = MonitorSet::from_rects(&rects, Geometry::new(0, 0, 1, 1));
        assert_eq!(set.len(), MAX_MONITORS);
    }

    #[test]
    fn test_bar_lookup() {
        let mut set = dual();
        for (i, mon) in set.iter_mut().enumerate() {
            mon.bar = Some(500 + i as u32);
        }
        assert_eq!(set.bar_index(501), Some(1));
        assert!(set.is_bar(500));
        assert!(!set.is_bar(42));
        assert_eq!(set.bars(), vec![500, 501]);
    }
}
