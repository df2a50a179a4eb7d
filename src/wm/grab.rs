//! Scoped input grabs
//!
//! A grab lives exactly as long as its guard; dropping the guard releases it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;

/// Attempts made before giving up on a keyboard grab
pub const KEYBOARD_GRAB_RETRIES: u32 = 50;
const KEYBOARD_GRAB_DELAY: Duration = Duration::from_millis(10);

/// Active keyboard grab
pub struct KeyboardGrab {
    conn: Arc<RustConnection>,
}

impl KeyboardGrab {
    /// Grab the keyboard, retrying while another client holds it.
    /// Returns `Ok(None)` if it never became available.
    pub fn acquire(conn: &Arc<RustConnection>, window: Window) -> Result<Option<Self>> {
        for attempt in 0..KEYBOARD_GRAB_RETRIES {
            let reply = conn
                .grab_keyboard(true, window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
                .reply()?;
            if reply.status == GrabStatus::SUCCESS {
                debug!("Keyboard grabbed after {} attempt(s)", attempt + 1);
                return Ok(Some(Self { conn: conn.clone() }));
            }
            trace!("Keyboard grab busy ({:?}), retrying", reply.status);
            std::thread::sleep(KEYBOARD_GRAB_DELAY);
        }
        warn!("Could not grab keyboard after {} attempts", KEYBOARD_GRAB_RETRIES);
        Ok(None)
    }
}

impl Drop for KeyboardGrab {
    fn drop(&mut self) {
        let _ = self.conn.ungrab_keyboard(CURRENT_TIME);
        let _ = self.conn.flush();
        debug!("Keyboard released");
    }
}

/// Active pointer grab
pub struct PointerGrab {
    conn: Arc<RustConnection>,
}

impl PointerGrab {
    /// Grab the pointer to `window`. Returns `Ok(None)` if the server refused.
    pub fn acquire(
        conn: &Arc<RustConnection>,
        window: Window,
        event_mask: EventMask,
        owner_events: bool,
    ) -> Result<Option<Self>> {
        let reply = conn
            .grab_pointer(
                owner_events,
                window,
                event_mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                CURRENT_TIME,
            )?
            .reply()?;

        if reply.status != GrabStatus::SUCCESS {
            warn!("Pointer grab on {} refused: {:?}", window, reply.status);
            return Ok(None);
        }
        Ok(Some(Self { conn: conn.clone() }))
    }
}

impl Drop for PointerGrab {
    fn drop(&mut self) {
        let _ = self.conn.ungrab_pointer(CURRENT_TIME);
        let _ = self.conn.flush();
        debug!("Pointer released");
    }
}
