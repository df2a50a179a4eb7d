use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;

/// Maximum number of tracked clients
pub const MAX_CLIENTS: usize = 256;

/// Window Manager client state
/// Represents a top-level window being managed by the WM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Application window ID
    pub window: Window,

    /// Decorative frame the window is reparented into.
    /// `None` for windows deliberately left unframed (docks, menus, ...)
    pub frame: Option<Window>,

    /// Is the window currently covering its whole monitor?
    pub fullscreen: bool,

    /// Frame geometry saved before going fullscreen or snapping
    pub saved_geometry: Option<Geometry>,

    /// Index of the owning monitor
    pub monitor: usize,
}

impl Client {
    pub fn new(window: Window, frame: Option<Window>, monitor: usize) -> Self {
        Self {
            window,
            frame,
            fullscreen: false,
            saved_geometry: None,
            monitor,
        }
    }

    pub fn is_framed(&self) -> bool {
        self.frame.is_some()
    }
}

/// Insertion-ordered client table.
///
/// Order matters: it is the order of the published client list and of the
/// hidden-window menu.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new client. Returns `false` (and tracks nothing) when the
    /// table is full or the window is already tracked.
    pub fn add(&mut self, window: Window, frame: Option<Window>, monitor: usize) -> bool {
        if self.clients.len() >= MAX_CLIENTS || self.contains(window) {
            return false;
        }
        self.clients.push(Client::new(window, frame, monitor));
        true
    }

    /// Forget a client, keeping the relative order of the rest
    pub fn remove(&mut self, window: Window) -> Option<Client> {
        let pos = self.clients.iter().position(|c| c.window == window)?;
        Some(self.clients.remove(pos))
    }

    pub fn contains(&self, window: Window) -> bool {
        self.clients.iter().any(|c| c.window == window)
    }

    pub fn frame_of(&self, window: Window) -> Option<Window> {
        self.state_of(window).and_then(|c| c.frame)
    }

    pub fn client_of(&self, frame: Window) -> Option<Window> {
        self.state_of_frame(frame).map(|c| c.window)
    }

    pub fn state_of(&self, window: Window) -> Option<&Client> {
        self.clients.iter().find(|c| c.window == window)
    }

    pub fn state_of_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.window == window)
    }

    pub fn state_of_frame(&self, frame: Window) -> Option<&Client> {
        self.clients.iter().find(|c| c.frame == Some(frame))
    }

    pub fn state_of_frame_mut(&mut self, frame: Window) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.frame == Some(frame))
    }

    /// Resolve either a client or a frame handle to its client entry
    pub fn lookup(&self, window: Window) -> Option<&Client> {
        self.state_of(window).or_else(|| self.state_of_frame(window))
    }

    /// Managed window handles in insertion order
    pub fn windows(&self) -> Vec<Window> {
        self.clients.iter().map(|c| c.window).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// What an UnmapNotify means for the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmapAction {
    Ignore,
    /// Drop an unframed client
    Forget,
    /// Tear down this frame and drop its client
    Unframe(Window),
}

/// Decide how to react to `client` being unmapped.
///
/// Unframed windows are only seen through the root's SubstructureNotify.
/// Framed clients also show up there when they are reparented into their
/// frame, so for them only the copy reported on the client or frame counts.
pub fn unmap_action(client: Option<&Client>, from_root: bool) -> UnmapAction {
    match client {
        None => UnmapAction::Ignore,
        Some(Client { frame: None, .. }) => UnmapAction::Forget,
        Some(Client { frame: Some(_), .. }) if from_root => UnmapAction::Ignore,
        Some(Client { frame: Some(frame), .. }) => UnmapAction::Unframe(*frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lookups_are_inverse() {
        let mut reg = ClientRegistry::new();
        assert!(reg.add(10, Some(110), 0));
        assert!(reg.add(20, None, 0));
        assert!(reg.add(30, Some(130), 1));

        for client in reg.iter() {
            if let Some(frame) = client.frame {
                assert_eq!(reg.client_of(frame), Some(client.window));
                assert_eq!(reg.frame_of(client.window), Some(frame));
            }
        }
        assert_eq!(reg.frame_of(20), None);
        assert_eq!(reg.client_of(999), None);
    }

    #[test]
    fn test_duplicate_window_rejected() {
        let mut reg = ClientRegistry::new();
        assert!(reg.add(10, Some(110), 0));
        assert!(!reg.add(10, Some(111), 0));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.frame_of(10), Some(110));
    }

    #[test]
    fn test_capacity_limit() {
        let mut reg = ClientRegistry::new();
        for w in 0..MAX_CLIENTS as u32 {
            assert!(reg.add(w + 1, None, 0));
        }
        assert!(!reg.add(9999, Some(1), 0));
        assert_eq!(reg.len(), MAX_CLIENTS);
        assert!(!reg.contains(9999));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut reg = ClientRegistry::new();
        for w in [1, 2, 3, 4] {
            reg.add(w, Some(w + 100), 0);
        }
        let removed = reg.remove(2).unwrap();
        assert_eq!(removed.frame, Some(102));
        assert_eq!(reg.windows(), vec![1, 3, 4]);
        assert!(reg.remove(2).is_none());
        assert_eq!(reg.client_of(102), None);
    }

    #[test]
    fn test_lookup_by_either_handle() {
        let mut reg = ClientRegistry::new();
        reg.add(5, Some(50), 0);
        assert_eq!(reg.lookup(5).map(|c| c.window), Some(5));
        assert_eq!(reg.lookup(50).map(|c| c.window), Some(5));

        assert!(reg.lookup(6).is_none());
        reg.state_of_frame_mut(50).unwrap().monitor = 2;
        assert_eq!(reg.state_of(5).unwrap().monitor, 2);
    }

    #[test]
    fn test_unmap_of_unframed_window_forgets_it() {
        let mut reg = ClientRegistry::new();
        reg.add(7, None, 0);
        assert_eq!(unmap_action(reg.state_of(7), true), UnmapAction::Forget);
        assert_eq!(unmap_action(reg.state_of(7), false), UnmapAction::Forget);

        reg.remove(7);
        assert!(reg.windows().is_empty());
    }

    #[test]
    fn test_unmap_of_framed_window() {
        let mut reg = ClientRegistry::new();
        reg.add(8, Some(80), 0);
        // The reparent into the frame is reported through the root
        assert_eq!(unmap_action(reg.state_of(8), true), UnmapAction::Ignore);
        assert_eq!(unmap_action(reg.state_of(8), false), UnmapAction::Unframe(80));
        // Hiding a frame unmaps the frame, not a client
        assert_eq!(unmap_action(reg.state_of(80), true), UnmapAction::Ignore);
        assert_eq!(unmap_action(None, false), UnmapAction::Ignore);
    }
}
