//! Focus Module
//!
//! The single focused-window and active-monitor value.

use x11rb::protocol::xproto::Window;

use crate::wm::client::ClientRegistry;

/// Current keyboard focus and the monitor the user is working on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Focus {
    /// Focused client window, if any
    pub window: Option<Window>,
    /// Index of the active monitor (drives the bar accent)
    pub monitor: usize,
}

impl Focus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a focus change onto `window`, taking the active monitor from
    /// the client's owning monitor when the window is managed
    pub fn set(&mut self, window: Window, registry: &ClientRegistry) {
        self.window = Some(window);
        if let Some(client) = registry.state_of(window) {
            self.monitor = client.monitor;
        }
    }

    /// Drop focus if it points at a window that just went away.
    /// Returns true when focus changed.
    pub fn forget(&mut self, window: Window) -> bool {
        if self.window == Some(window) {
            self.window = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_follows_client_monitor() {
        let mut reg = ClientRegistry::new();
        reg.add(7, Some(70), 1);

        let mut focus = Focus::new();
        focus.set(7, &reg);
        assert_eq!(focus.window, Some(7));
        assert_eq!(focus.monitor, 1);

        // Unmanaged window keeps the current monitor
        focus.set(99, &reg);
        assert_eq!(focus.window, Some(99));
        assert_eq!(focus.monitor, 1);
    }

    #[test]
    fn test_forget_only_clears_matching_window() {
        let mut focus = Focus {
            window: Some(3),
            monitor: 0,
        };
        assert!(!focus.forget(4));
        assert_eq!(focus.window, Some(3));
        assert!(focus.forget(3));
        assert_eq!(focus.window, None);
    }
}
