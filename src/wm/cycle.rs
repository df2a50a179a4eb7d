//! Cycle Module
//!
//! Window switching (Alt+Tab). Building the candidate list, moving the
//! selection and interpreting keys are pure; the open switcher owns its
//! overlay and keyboard grab so closing it always releases both.

use x11rb::protocol::xproto::Window;

use crate::shared::Visibility;
use crate::wm::client::ClientRegistry;
use crate::wm::grab::KeyboardGrab;
use crate::wm::keyboard::Modifiers;
use crate::wm::keysyms::*;
use crate::wm::overlay::Overlay;

pub const ALT_TAB_WIDTH: u32 = 500;
pub const ALT_TAB_ITEM_H: u32 = 44;
pub const ALT_TAB_PADDING: u32 = 6;

/// One switchable window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub frame: Window,
    pub client: Window,
    pub name: String,
    pub hidden: bool,
}

/// Build the candidate list from the root's children (bottom-to-top, as
/// returned by QueryTree).
///
/// Visible frames come first, topmost first, then hidden frames in the same
/// order. Frames that are mapped but not viewable are skipped, as is
/// anything in `excluded` (bars, the check window) or not a managed frame.
pub fn build_candidates(
    stacking: &[Window],
    registry: &ClientRegistry,
    excluded: &[Window],
    mut visibility: impl FnMut(Window) -> Option<Visibility>,
    mut title: impl FnMut(Window) -> String,
) -> Vec<Candidate> {
    let mut visible = Vec::new();
    let mut hidden = Vec::new();

    for &frame in stacking.iter().rev() {
        if excluded.contains(&frame) {
            continue;
        }
        let Some(client) = registry.client_of(frame) else {
            continue;
        };
        let bucket = match visibility(frame) {
            Some(Visibility::Visible) => &mut visible,
            Some(Visibility::Hidden) => &mut hidden,
            Some(Visibility::Unviewable) | None => continue,
        };
        let name = title(client);
        bucket.push(Candidate {
            frame,
            client,
            name: if name.is_empty() {
                "(unnamed)".to_string()
            } else {
                name
            },
            hidden: false,
        });
    }

    for candidate in &mut hidden {
        candidate.hidden = true;
    }
    visible.extend(hidden);
    visible
}

/// Cyclic selection index over a fixed-size list; always in `[0, count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    index: usize,
    count: usize,
}

impl Selection {
    /// Switcher default: the second entry when there is one
    pub fn for_switcher(count: usize) -> Self {
        Self {
            index: if count >= 2 { 1 } else { 0 },
            count,
        }
    }

    pub fn first(count: usize) -> Self {
        Self { index: 0, count }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next(&mut self) {
        if self.count > 0 {
            self.index = (self.index + 1) % self.count;
        }
    }

    pub fn prev(&mut self) {
        if self.count > 0 {
            self.index = (self.index + self.count - 1) % self.count;
        }
    }

    /// Jump to `index`; returns true if the selection changed
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.count && index != self.index {
            self.index = index;
            true
        } else {
            false
        }
    }
}

/// What opening the switcher should do for a candidate count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPlan {
    Nothing,
    /// Activate the only candidate straight away
    Immediate,
    /// Show the overlay and grab the keyboard
    Overlay,
}

pub fn plan_open(count: usize) -> OpenPlan {
    match count {
        0 => OpenPlan::Nothing,
        1 => OpenPlan::Immediate,
        _ => OpenPlan::Overlay,
    }
}

/// Meaning of a key press while a list overlay is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKey {
    Next,
    Prev,
    Confirm,
    Cancel,
    Ignore,
}

/// Interpret a key press (column-0 keysym plus event state)
pub fn classify_key(keysym: u32, state: u16) -> ListKey {
    match keysym {
        XK_TAB if Modifiers::from_bits_truncate(state).contains(Modifiers::SHIFT) => ListKey::Prev,
        XK_TAB => ListKey::Next,
        XK_UP | XK_K => ListKey::Prev,
        XK_DOWN | XK_J => ListKey::Next,
        XK_RETURN => ListKey::Confirm,
        XK_ESCAPE => ListKey::Cancel,
        _ => ListKey::Ignore,
    }
}

/// Keysyms whose release may end the switch, for the modifiers of the
/// binding that opened it. Falls back to Alt/Meta when the binding has none.
pub fn trigger_keysyms(mods: Modifiers) -> Vec<u32> {
    let mut syms = Vec::new();
    if mods.contains(Modifiers::MOD1) || mods.intersection(Modifiers::RELEVANT).is_empty() {
        syms.extend([XK_ALT_L, XK_ALT_R, XK_META_L, XK_META_R]);
    }
    if mods.contains(Modifiers::MOD4) {
        syms.extend([XK_SUPER_L, XK_SUPER_R, XK_HYPER_L, XK_HYPER_R]);
    }
    if mods.contains(Modifiers::CONTROL) {
        syms.extend([XK_CONTROL_L, XK_CONTROL_R]);
    }
    if mods.contains(Modifiers::SHIFT) {
        syms.extend([XK_SHIFT_L, XK_SHIFT_R]);
    }
    syms
}

/// Is any of `keycodes` down in a QueryKeymap bit vector?
pub fn any_pressed(keymap: &[u8], keycodes: &[u8]) -> bool {
    keycodes.iter().any(|&kc| {
        keymap
            .get(kc as usize / 8)
            .is_some_and(|byte| byte & (1 << (kc % 8)) != 0)
    })
}

/// An open switcher. Field order is drop order: the keyboard is released
/// before the overlay window goes away.
pub struct SwitcherSession {
    pub grab: KeyboardGrab,
    pub overlay: Overlay,
    pub candidates: Vec<Candidate>,
    pub selection: Selection,
    /// Keysyms whose release confirms the switch
    pub trigger_keysyms: Vec<u32>,
}

impl SwitcherSession {
    pub fn selected(&self) -> Option<&Candidate> {
        self.candidates.get(self.selection.index())
    }

    /// Overlay height for `count` rows
    pub fn height_for(count: usize) -> u32 {
        count as u32 * ALT_TAB_ITEM_H + ALT_TAB_PADDING * 2
    }
}

/// Switcher state
#[derive(Default)]
pub enum Switcher {
    #[default]
    Closed,
    Open(SwitcherSession),
}

impl Switcher {
    pub fn is_open(&self) -> bool {
        matches!(self, Switcher::Open(_))
    }

    pub fn session(&self) -> Option<&SwitcherSession> {
        match self {
            Switcher::Open(session) => Some(session),
            Switcher::Closed => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut SwitcherSession> {
        match self {
            Switcher::Open(session) => Some(session),
            Switcher::Closed => None,
        }
    }

    /// Close, returning the session so the caller can act on the selection.
    /// Resources are released when the returned value is dropped.
    pub fn take(&mut self) -> Option<SwitcherSession> {
        match std::mem::take(self) {
            Switcher::Open(session) => Some(session),
            Switcher::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClientRegistry {
        let mut reg = ClientRegistry::new();
        reg.add(1, Some(101), 0);
        reg.add(2, Some(102), 0);
        reg.add(3, Some(103), 0);
        reg.add(4, Some(104), 0);
        reg.add(5, None, 0);
        reg
    }

    fn visibility(frame: Window) -> Option<Visibility> {
        match frame {
            102 | 104 => Some(Visibility::Hidden),
            _ => Some(Visibility::Visible),
        }
    }

    #[test]
    fn test_visible_before_hidden_topmost_first() {
        // bottom-to-top: 101, bar 900, 102, 103, 104
        let stacking = [101, 900, 102, 103, 104];
        let list = build_candidates(&stacking, &registry(), &[900], visibility, |c| {
            format!("win{}", c)
        });

        let frames: Vec<Window> = list.iter().map(|c| c.frame).collect();
        assert_eq!(frames, vec![103, 101, 104, 102]);
        assert_eq!(
            list.iter().map(|c| c.hidden).collect::<Vec<_>>(),
            vec![false, false, true, true]
        );
        assert_eq!(list[0].client, 3);
        assert_eq!(list[0].name, "win3");
    }

    #[test]
    fn test_candidates_skip_unmanaged_and_unviewable() {
        let stacking = [5, 101, 555, 102];
        let list = build_candidates(
            &stacking,
            &registry(),
            &[],
            |f| (f != 102).then_some(Visibility::Visible).or(Some(Visibility::Unviewable)),
            |_| String::new(),
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].frame, 101);
        assert_eq!(list[0].name, "(unnamed)");
    }

    #[test]
    fn test_selection_wraps_both_ways() {
        let mut sel = Selection::for_switcher(3);
        assert_eq!(sel.index(), 1);
        sel.next();
        sel.next();
        assert_eq!(sel.index(), 0);
        sel.prev();
        assert_eq!(sel.index(), 2);

        for _ in 0..100 {
            sel.prev();
            assert!(sel.index() < 3);
        }
        for _ in 0..101 {
            sel.next();
            assert!(sel.index() < 3);
        }
    }

    #[test]
    fn test_selection_defaults_and_select() {
        assert_eq!(Selection::for_switcher(1).index(), 0);
        assert_eq!(Selection::for_switcher(2).index(), 1);

        let mut sel = Selection::first(4);
        assert!(sel.select(3));
        assert!(!sel.select(3));
        assert!(!sel.select(4));
        assert_eq!(sel.index(), 3);

        // Empty lists never move
        let mut empty = Selection::first(0);
        empty.next();
        empty.prev();
        assert_eq!(empty.index(), 0);
    }

    #[test]
    fn test_plan_open() {
        assert_eq!(plan_open(0), OpenPlan::Nothing);
        assert_eq!(plan_open(1), OpenPlan::Immediate);
        assert_eq!(plan_open(2), OpenPlan::Overlay);
    }

    #[test]
    fn test_classify_keys() {
        assert_eq!(classify_key(XK_TAB, Modifiers::MOD1.bits()), ListKey::Next);
        assert_eq!(
            classify_key(XK_TAB, (Modifiers::MOD1 | Modifiers::SHIFT).bits()),
            ListKey::Prev
        );
        assert_eq!(classify_key(XK_K, 0), ListKey::Prev);
        assert_eq!(classify_key(XK_DOWN, 0), ListKey::Next);
        assert_eq!(classify_key(XK_RETURN, 0), ListKey::Confirm);
        assert_eq!(classify_key(XK_ESCAPE, 0), ListKey::Cancel);
        assert_eq!(classify_key(0x61, 0), ListKey::Ignore);
    }

    #[test]
    fn test_trigger_keysyms() {
        let alt = trigger_keysyms(Modifiers::MOD1);
        assert!(alt.contains(&XK_ALT_L) && alt.contains(&XK_META_R));
        assert!(!alt.contains(&XK_SUPER_L));

        let sup = trigger_keysyms(Modifiers::MOD4 | Modifiers::SHIFT);
        assert!(sup.contains(&XK_SUPER_R) && sup.contains(&XK_SHIFT_L));
        assert!(!sup.contains(&XK_ALT_L));

        assert_eq!(trigger_keysyms(Modifiers::empty()).len(), 4);
    }

    #[test]
    fn test_any_pressed() {
        let mut keymap = [0u8; 32];
        keymap[64 / 8] |= 1 << (64 % 8);
        assert!(any_pressed(&keymap, &[64]));
        assert!(any_pressed(&keymap, &[108, 64]));
        assert!(!any_pressed(&keymap, &[65, 108]));
        assert!(!any_pressed(&keymap, &[]));
    }
}
