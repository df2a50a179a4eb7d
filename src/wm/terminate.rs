//! Terminate Module
//!
//! Closing client windows: ask politely through WM_DELETE_WINDOW when the
//! client speaks it, otherwise kill its connection.

use anyhow::Result;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

use crate::wm::ewmh::Atoms;

/// How a close request was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// WM_DELETE_WINDOW was sent; the client decides
    Graceful,
    /// The client's connection was killed
    Forced,
}

/// Close a client window, probing WM_PROTOCOLS on every call
pub fn close_client<C: Connection>(conn: &C, atoms: &Atoms, window: Window) -> Result<CloseOutcome> {
    let supports_delete = atoms.supports_delete_protocol(conn, window).unwrap_or_else(|e| {
        debug!("WM_PROTOCOLS query for {} failed: {}", window, e);
        false
    });

    if supports_delete {
        debug!("Sending WM_DELETE_WINDOW to {}", window);
        atoms.send_delete_window(conn, window)?;
        Ok(CloseOutcome::Graceful)
    } else {
        info!("Window {} has no WM_DELETE_WINDOW, killing client", window);
        conn.kill_client(window)?;
        Ok(CloseOutcome::Forced)
    }
}
