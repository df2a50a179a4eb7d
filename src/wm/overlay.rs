//! Override-redirect popup windows (switcher list, hidden-window menu)
//!
//! The window and its GC live exactly as long as the [`Overlay`] value.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::shared::Geometry;
use crate::wm::decorations::FontInfo;

/// Border drawn around overlays
pub const OVERLAY_BORDER: u16 = 2;

pub struct Overlay {
    conn: Arc<RustConnection>,
    pub window: Window,
    pub gc: Gcontext,
    pub width: u32,
    pub height: u32,
}

impl Overlay {
    /// Create, map and raise an overlay at `geometry`
    pub fn open(
        conn: &Arc<RustConnection>,
        root: Window,
        geometry: Geometry,
        border_pixel: u32,
        background_pixel: u32,
        event_mask: EventMask,
        font: &FontInfo,
    ) -> Result<Self> {
        let window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            root,
            geometry.x as i16,
            geometry.y as i16,
            geometry.width as u16,
            geometry.height as u16,
            OVERLAY_BORDER,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(background_pixel)
                .border_pixel(border_pixel)
                .override_redirect(1)
                .save_under(1)
                .event_mask(event_mask),
        )?;

        // From here on the window is owned by the guard
        let mut overlay = Self {
            conn: conn.clone(),
            window,
            gc: x11rb::NONE,
            width: geometry.width,
            height: geometry.height,
        };

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new().font(font.font))?;
        overlay.gc = gc;

        conn.map_window(window)?;
        conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        conn.flush()?;

        debug!("Overlay {} opened at {:?}", window, geometry);
        Ok(overlay)
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        if self.gc != x11rb::NONE {
            let _ = self.conn.free_gc(self.gc);
        }
        let _ = self.conn.unmap_window(self.window);
        let _ = self.conn.destroy_window(self.window);
        let _ = self.conn.flush();
        debug!("Overlay {} destroyed", self.window);
    }
}

/// Center a `width` x `height` box on a monitor rectangle
pub fn centered(monitor: Geometry, width: u32, height: u32) -> Geometry {
    Geometry::new(
        monitor.x + (monitor.width as i32 - width as i32) / 2,
        monitor.y + (monitor.height as i32 - height as i32) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_on_second_monitor() {
        let mon = Geometry::new(1920, 0, 1280, 1024);
        assert_eq!(centered(mon, 500, 100), Geometry::new(2310, 462, 500, 100));
    }
}
