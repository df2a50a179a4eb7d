//! EWMH (Extended Window Manager Hints) implementation
//!
//! The small slice of the desktop interoperability hints lwm speaks: the
//! supported list, the supporting check window, the client list, the active
//! window, window types, fullscreen state, and the WM_DELETE_WINDOW protocol.

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ClientMessageEvent, *};
use x11rb::wrapper::ConnectionExt as _;

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_client_list: Atom,
    pub net_active_window: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_wm_name: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_wm_window_type_menu: Atom,
    pub net_wm_window_type_toolbar: Atom,
    pub net_wm_window_type_splash: Atom,
    pub net_wm_window_type_utility: Atom,
    pub net_wm_window_type_notification: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        // Helper to intern a single atom
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_normal: intern("_NET_WM_WINDOW_TYPE_NORMAL")?,
            net_wm_window_type_dialog: intern("_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_wm_window_type_dock: intern("_NET_WM_WINDOW_TYPE_DOCK")?,
            net_wm_window_type_menu: intern("_NET_WM_WINDOW_TYPE_MENU")?,
            net_wm_window_type_toolbar: intern("_NET_WM_WINDOW_TYPE_TOOLBAR")?,
            net_wm_window_type_splash: intern("_NET_WM_WINDOW_TYPE_SPLASH")?,
            net_wm_window_type_utility: intern("_NET_WM_WINDOW_TYPE_UTILITY")?,
            net_wm_window_type_notification: intern("_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    /// Window types that are mapped as-is, without a frame
    pub fn unframed_types(&self) -> [Atom; 6] {
        [
            self.net_wm_window_type_dock,
            self.net_wm_window_type_menu,
            self.net_wm_window_type_toolbar,
            self.net_wm_window_type_splash,
            self.net_wm_window_type_utility,
            self.net_wm_window_type_notification,
        ]
    }

    /// Set up _NET_SUPPORTED on root window
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window) -> Result<()> {
        let supported = [
            self.net_supported,
            self.net_client_list,
            self.net_active_window,
            self.net_supporting_wm_check,
            self.net_wm_name,
            self.net_wm_state,
            self.net_wm_state_fullscreen,
            self.net_wm_window_type,
            self.net_wm_window_type_normal,
            self.net_wm_window_type_dialog,
            self.net_wm_window_type_dock,
            self.net_wm_window_type_menu,
            self.net_wm_window_type_toolbar,
            self.net_wm_window_type_splash,
            self.net_wm_window_type_utility,
            self.net_wm_window_type_notification,
        ];

        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_supported,
            AtomEnum::ATOM,
            &supported,
        )?;

        Ok(())
    }

    /// Create the hidden check window and point _NET_SUPPORTING_WM_CHECK at
    /// it from both the root and itself
    pub fn setup_supporting_wm_check<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        name: &str,
    ) -> Result<Window> {
        let child = conn.generate_id()?;
        conn.create_window(
            0,
            child,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            0,
            &CreateWindowAux::new(),
        )?;

        for window in [root, child] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[child],
            )?;
        }

        conn.change_property8(
            PropMode::REPLACE,
            child,
            self.net_wm_name,
            self.utf8_string,
            name.as_bytes(),
        )?;

        debug!("Supporting WM check window: {}", child);
        Ok(child)
    }

    /// Update _NET_ACTIVE_WINDOW
    pub fn update_active_window<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        window: Option<Window>,
    ) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_active_window,
            AtomEnum::WINDOW,
            &[window.unwrap_or(x11rb::NONE)],
        )?;
        Ok(())
    }

    /// Update _NET_CLIENT_LIST, removing it when nothing is managed
    pub fn update_client_list<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        windows: &[Window],
    ) -> Result<()> {
        if windows.is_empty() {
            conn.delete_property(root, self.net_client_list)?;
        } else {
            conn.change_property32(
                PropMode::REPLACE,
                root,
                self.net_client_list,
                AtomEnum::WINDOW,
                windows,
            )?;
        }
        Ok(())
    }

    /// First _NET_WM_WINDOW_TYPE atom of a window, if set
    pub fn get_window_type<C: Connection>(&self, conn: &C, window: Window) -> Result<Option<Atom>> {
        let reply = conn
            .get_property(false, window, self.net_wm_window_type, AtomEnum::ATOM, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut atoms| atoms.next()))
    }

    /// Should a window of this type get a frame?
    pub fn should_frame<C: Connection>(&self, conn: &C, window: Window) -> bool {
        match self.get_window_type(conn, window) {
            Ok(window_type) => should_frame(window_type, &self.unframed_types()),
            Err(e) => {
                debug!("No window type for {}: {}", window, e);
                true
            }
        }
    }

    /// Get window title (_NET_WM_NAME, falling back to WM_NAME)
    pub fn get_window_title<C: Connection>(&self, conn: &C, window: Window) -> Result<String> {
        let reply = conn
            .get_property(false, window, self.net_wm_name, self.utf8_string, 0, 1024)?
            .reply()?;
        if !reply.value.is_empty() {
            return Ok(String::from_utf8_lossy(&reply.value).to_string());
        }

        let reply = conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        Ok(String::from_utf8_lossy(&reply.value).to_string())
    }

    /// Check if window supports WM_DELETE_WINDOW protocol.
    /// Always asks the server; the answer is never cached.
    pub fn supports_delete_protocol<C: Connection>(&self, conn: &C, window: Window) -> Result<bool> {
        let reply = conn
            .get_property(false, window, self.wm_protocols, AtomEnum::ATOM, 0, 1024)?
            .reply()?;
        Ok(reply
            .value32()
            .is_some_and(|mut protocols| protocols.any(|a| a == self.wm_delete_window)))
    }

    /// Send WM_DELETE_WINDOW message to close a window gracefully
    pub fn send_delete_window<C: Connection>(&self, conn: &C, window: Window) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.wm_protocols,
            [self.wm_delete_window, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    /// Publish or clear _NET_WM_STATE_FULLSCREEN on a client, keeping any
    /// other states the client set
    pub fn set_fullscreen_state<C: Connection>(
        &self,
        conn: &C,
        window: Window,
        fullscreen: bool,
    ) -> Result<()> {
        let reply = conn
            .get_property(false, window, self.net_wm_state, AtomEnum::ATOM, 0, 1024)?
            .reply()?;
        let mut states: Vec<Atom> = reply
            .value32()
            .map(|atoms| atoms.filter(|&a| a != self.net_wm_state_fullscreen).collect())
            .unwrap_or_default();
        if fullscreen {
            states.push(self.net_wm_state_fullscreen);
        }

        conn.change_property32(
            PropMode::REPLACE,
            window,
            self.net_wm_state,
            AtomEnum::ATOM,
            &states,
        )?;
        Ok(())
    }
}

/// `_NET_WM_STATE` client message action (data[0])
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(StateAction::Remove),
            1 => Some(StateAction::Add),
            2 => Some(StateAction::Toggle),
            _ => None,
        }
    }

    /// State a property should end up in after this action
    pub fn apply(self, current: bool) -> bool {
        match self {
            StateAction::Remove => false,
            StateAction::Add => true,
            StateAction::Toggle => !current,
        }
    }
}

/// Decode a `_NET_WM_STATE` message: the fullscreen state the client asks
/// for, or `None` when the message is not about fullscreen
pub fn requested_fullscreen(data: [u32; 5], fullscreen_atom: Atom, current: bool) -> Option<bool> {
    if data[1] != fullscreen_atom && data[2] != fullscreen_atom {
        return None;
    }
    StateAction::from_u32(data[0]).map(|action| action.apply(current))
}

/// Frame decision from the first window type atom
pub fn should_frame(window_type: Option<Atom>, unframed: &[Atom]) -> bool {
    window_type.is_none_or(|t| !unframed.contains(&t))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULLSCREEN: Atom = 300;

    #[test]
    fn test_fullscreen_request_actions() {
        assert_eq!(requested_fullscreen([1, FULLSCREEN, 0, 0, 0], FULLSCREEN, false), Some(true));
        assert_eq!(requested_fullscreen([1, FULLSCREEN, 0, 0, 0], FULLSCREEN, true), Some(true));
        assert_eq!(requested_fullscreen([0, FULLSCREEN, 0, 0, 0], FULLSCREEN, true), Some(false));
        assert_eq!(requested_fullscreen([2, 0, FULLSCREEN, 0, 0], FULLSCREEN, true), Some(false));
        assert_eq!(requested_fullscreen([2, 0, FULLSCREEN, 0, 0], FULLSCREEN, false), Some(true));
    }

    #[test]
    fn test_unrelated_state_messages_ignored() {
        assert_eq!(requested_fullscreen([1, 301, 302, 0, 0], FULLSCREEN, false), None);
        assert_eq!(requested_fullscreen([7, FULLSCREEN, 0, 0, 0], FULLSCREEN, false), None);
    }

    #[test]
    fn test_should_frame_by_type() {
        let unframed = [10, 11, 12];
        assert!(should_frame(None, &unframed));
        assert!(should_frame(Some(99), &unframed));
        assert!(!should_frame(Some(11), &unframed));
    }
}
