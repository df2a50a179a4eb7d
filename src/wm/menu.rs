//! Menu Module
//!
//! The hidden-window menu: a popup listing unmapped frames in registry order.
//! Hovering or Up/Down moves the selection; a click or Return restores the
//! selected window.

use x11rb::protocol::xproto::Window;

use crate::shared::Visibility;
use crate::wm::client::ClientRegistry;
use crate::wm::cycle::{ListKey, Selection, classify_key};
use crate::wm::grab::{KeyboardGrab, PointerGrab};
use crate::wm::keysyms::XK_TAB;
use crate::wm::overlay::Overlay;

pub const MENU_ITEM_H: u32 = 36;
pub const MENU_WIDTH: u32 = 400;
/// Entries past this are not listed
pub const MAX_MENU_ENTRIES: usize = 64;

/// A hidden window offered by the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub frame: Window,
    pub client: Window,
    pub name: String,
}

/// Unmapped framed clients, in registry order
pub fn hidden_entries(
    registry: &ClientRegistry,
    mut visibility: impl FnMut(Window) -> Option<Visibility>,
    mut title: impl FnMut(Window) -> String,
) -> Vec<MenuEntry> {
    registry
        .iter()
        .filter_map(|c| c.frame.map(|frame| (frame, c.window)))
        .filter(|&(frame, _)| visibility(frame) == Some(Visibility::Hidden))
        .take(MAX_MENU_ENTRIES)
        .map(|(frame, client)| {
            let name = title(client);
            MenuEntry {
                frame,
                client,
                name: if name.is_empty() {
                    "(unnamed)".to_string()
                } else {
                    name
                },
            }
        })
        .collect()
}

/// Row under a menu-relative `y`, if any
pub fn item_at(y: i32, count: usize) -> Option<usize> {
    if y < 0 {
        return None;
    }
    let item = (y as u32 / MENU_ITEM_H) as usize;
    (item < count).then_some(item)
}

/// Keys understood by the menu: the list keys minus Tab cycling
pub fn classify_menu_key(keysym: u32) -> ListKey {
    if keysym == XK_TAB {
        ListKey::Ignore
    } else {
        classify_key(keysym, 0)
    }
}

/// An open menu. Field order is drop order: input is released before the
/// popup is destroyed.
pub struct MenuSession {
    pub keyboard: KeyboardGrab,
    pub pointer: Option<PointerGrab>,
    pub overlay: Overlay,
    pub entries: Vec<MenuEntry>,
    pub selection: Selection,
}

impl MenuSession {
    pub fn selected(&self) -> Option<&MenuEntry> {
        self.entries.get(self.selection.index())
    }

    /// Track the pointer; returns true when the highlighted row changed
    pub fn hover(&mut self, y: i32) -> bool {
        item_at(y, self.entries.len()).is_some_and(|item| self.selection.select(item))
    }
}
