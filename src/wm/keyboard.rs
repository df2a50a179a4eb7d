//! Keyboard Module
//!
//! Key binding table, modifier masks, keycode/keysym mapping, and the root
//! window key grabs.

use anyhow::Result;
use bitflags::bitflags;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as _;

use crate::wm::placement::SnapDirection;

bitflags! {
    /// Core protocol modifier bits (same layout as `ModMask`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const MOD4    = 1 << 6;
    }
}

impl Modifiers {
    /// Modifiers that take part in binding matches; Lock and NumLock (Mod2)
    /// are ignored
    pub const RELEVANT: Modifiers = Modifiers::MOD1
        .union(Modifiers::MOD4)
        .union(Modifiers::SHIFT)
        .union(Modifiers::CONTROL);

    /// Parse modifier names such as `Mod4`, `Mod1+Shift` or `Mod4Control`.
    /// Any string containing a modifier name enables that modifier.
    pub fn from_names(names: &str) -> Self {
        let mut mods = Modifiers::empty();
        for (name, flag) in [
            ("Mod1", Modifiers::MOD1),
            ("Mod4", Modifiers::MOD4),
            ("Shift", Modifiers::SHIFT),
            ("Control", Modifiers::CONTROL),
        ] {
            if names.contains(name) {
                mods |= flag;
            }
        }
        mods
    }

    /// Mask an event state down to the relevant modifiers
    pub fn clean(state: u16) -> Self {
        Modifiers::from_bits_truncate(state) & Modifiers::RELEVANT
    }

    /// Every Lock/NumLock variant of this mask, for grabbing
    pub fn lock_variants(self) -> [Modifiers; 4] {
        [
            self,
            self | Modifiers::MOD2,
            self | Modifiers::LOCK,
            self | Modifiers::MOD2 | Modifiers::LOCK,
        ]
    }
}

impl From<Modifiers> for ModMask {
    fn from(mods: Modifiers) -> Self {
        ModMask::from(mods.bits())
    }
}

/// What a key binding does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Open (or advance) the window switcher
    AltTab,
    /// Show the hidden-window menu
    Menu,
    UnhideAll,
    Close,
    Fullscreen,
    Snap(SnapDirection),
    /// Run a shell command
    Spawn(String),
}

impl Action {
    /// Map a command string to a built-in action (case-insensitive), or a
    /// command to run
    pub fn parse(command: &str) -> Self {
        match command.trim().to_ascii_lowercase().as_str() {
            "quit" => Action::Quit,
            "alttab" => Action::AltTab,
            "menu" => Action::Menu,
            "unhide" => Action::UnhideAll,
            "close" => Action::Close,
            "fullscreen" => Action::Fullscreen,
            "snap_left" => Action::Snap(SnapDirection::Left),
            "snap_right" => Action::Snap(SnapDirection::Right),
            "maximize" => Action::Snap(SnapDirection::Maximize),
            "restore" => Action::Snap(SnapDirection::Restore),
            _ => Action::Spawn(command.trim().to_string()),
        }
    }
}

/// A configured key binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBind {
    pub modifiers: Modifiers,
    pub keysym: u32,
    pub action: Action,
}

/// Binding table in configuration order
#[derive(Debug, Clone, Default)]
pub struct Keybindings {
    binds: Vec<KeyBind>,
}

impl Keybindings {
    pub const MAX_BINDS: usize = 128;

    pub fn new(binds: Vec<KeyBind>) -> Self {
        Self { binds }
    }

    /// Append a binding; returns false when the table is full
    pub fn push(&mut self, bind: KeyBind) -> bool {
        if self.binds.len() >= Self::MAX_BINDS {
            return false;
        }
        self.binds.push(bind);
        true
    }

    /// First binding matching the keysym and the cleaned modifier state
    pub fn resolve(&self, keysym: u32, state: u16) -> Option<&KeyBind> {
        let mods = Modifiers::clean(state);
        self.binds
            .iter()
            .find(|b| b.keysym == keysym && b.modifiers == mods)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBind> {
        self.binds.iter()
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }
}

/// Snapshot of the server's keycode to keysym table
#[derive(Debug, Clone, Default)]
pub struct KeyboardMapping {
    min_keycode: u8,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyboardMapping {
    pub fn query<C: Connection>(conn: &C) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;

        let reply = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;

        Ok(Self::from_raw(
            min_keycode,
            reply.keysyms_per_keycode as usize,
            reply.keysyms,
        ))
    }

    pub fn from_raw(min_keycode: u8, keysyms_per_keycode: usize, keysyms: Vec<u32>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    /// Unshifted keysym for a keycode (column 0)
    pub fn keysym(&self, keycode: u8) -> u32 {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return 0;
        }
        let idx = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode;
        self.keysyms.get(idx).copied().unwrap_or(0)
    }

    /// Every keycode producing `keysym` in any column
    pub fn keycodes(&self, keysym: u32) -> Vec<u8> {
        if self.keysyms_per_keycode == 0 || keysym == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .filter_map(|(i, _)| u8::try_from(i + self.min_keycode as usize).ok())
            .collect()
    }

    /// First keycode producing `keysym`
    pub fn keycode(&self, keysym: u32) -> Option<u8> {
        self.keycodes(keysym).into_iter().next()
    }
}

/// Grab every binding on the root window, once per Lock/NumLock variant
pub fn grab_keys<C: Connection>(
    conn: &C,
    root: Window,
    bindings: &Keybindings,
    mapping: &KeyboardMapping,
) -> Result<()> {
    conn.ungrab_key(Grab::ANY, root, ModMask::ANY)?;

    for bind in bindings.iter() {
        let Some(keycode) = mapping.keycode(bind.keysym) else {
            warn!("No keycode for keysym 0x{:X}, binding skipped", bind.keysym);
            continue;
        };

        for mods in bind.modifiers.lock_variants() {
            conn.grab_key(
                true,
                root,
                ModMask::from(mods),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?;
        }
        debug!(
            "Grabbed keycode {} ({:?}) for {:?}",
            keycode, bind.modifiers, bind.action
        );
    }

    conn.sync()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(modifiers: Modifiers, keysym: u32, command: &str) -> KeyBind {
        KeyBind {
            modifiers,
            keysym,
            action: Action::parse(command),
        }
    }

    #[test]
    fn test_modifier_names() {
        assert_eq!(Modifiers::from_names("Mod4"), Modifiers::MOD4);
        assert_eq!(
            Modifiers::from_names("Mod1+Shift"),
            Modifiers::MOD1 | Modifiers::SHIFT
        );
        assert_eq!(
            Modifiers::from_names("Mod4ControlShift"),
            Modifiers::MOD4 | Modifiers::CONTROL | Modifiers::SHIFT
        );
        assert_eq!(Modifiers::from_names("None"), Modifiers::empty());
    }

    #[test]
    fn test_clean_ignores_lock_and_numlock() {
        let state = (Modifiers::MOD4 | Modifiers::MOD2 | Modifiers::LOCK).bits();
        assert_eq!(Modifiers::clean(state), Modifiers::MOD4);
        // Button bits above the modifiers are dropped too
        assert_eq!(Modifiers::clean(0x0100 | 0x0008), Modifiers::MOD1);
    }

    #[test]
    fn test_action_parse_is_case_insensitive() {
        assert_eq!(Action::parse("QUIT"), Action::Quit);
        assert_eq!(Action::parse("AltTab"), Action::AltTab);
        assert_eq!(Action::parse("Snap_Left"), Action::Snap(SnapDirection::Left));
        assert_eq!(Action::parse("maximize"), Action::Snap(SnapDirection::Maximize));
        assert_eq!(
            Action::parse("xterm -e top"),
            Action::Spawn("xterm -e top".to_string())
        );
    }

    #[test]
    fn test_first_matching_bind_wins() {
        let table = Keybindings::new(vec![
            bind(Modifiers::MOD4, 0x64, "dmenu_run"),
            bind(Modifiers::MOD4, 0x64, "quit"),
            bind(Modifiers::MOD4 | Modifiers::SHIFT, 0x64, "close"),
        ]);

        let hit = table.resolve(0x64, Modifiers::MOD4.bits()).unwrap();
        assert_eq!(hit.action, Action::Spawn("dmenu_run".to_string()));

        // NumLock on does not change the match
        let state = (Modifiers::MOD4 | Modifiers::MOD2).bits();
        assert_eq!(table.resolve(0x64, state).unwrap().action, hit.action);

        let state = (Modifiers::MOD4 | Modifiers::SHIFT).bits();
        assert_eq!(table.resolve(0x64, state).unwrap().action, Action::Close);

        assert!(table.resolve(0x64, 0).is_none());
        assert!(table.resolve(0x65, Modifiers::MOD4.bits()).is_none());
    }

    #[test]
    fn test_bind_table_capacity() {
        let mut table = Keybindings::default();
        for i in 0..Keybindings::MAX_BINDS as u32 {
            assert!(table.push(bind(Modifiers::MOD4, 0x20 + i, "true")));
        }
        assert!(!table.push(bind(Modifiers::MOD4, 0x1, "true")));
        assert_eq!(table.len(), Keybindings::MAX_BINDS);
    }

    #[test]
    fn test_keyboard_mapping_lookup() {
        // keycodes 8..=10, two columns each
        let mapping = KeyboardMapping::from_raw(8, 2, vec![0x61, 0x41, 0xFF09, 0xFE20, 0x61, 0]);
        assert_eq!(mapping.keysym(8), 0x61);
        assert_eq!(mapping.keysym(9), 0xFF09);
        assert_eq!(mapping.keysym(7), 0);
        assert_eq!(mapping.keysym(42), 0);

        assert_eq!(mapping.keycodes(0x61), vec![8, 10]);
        assert_eq!(mapping.keycode(0x41), Some(8));
        assert_eq!(mapping.keycode(0xFE20), Some(9));
        assert_eq!(mapping.keycode(0x7A), None);
    }

    #[test]
    fn test_lock_variants() {
        let variants = Modifiers::MOD1.lock_variants();
        assert_eq!(variants[0], Modifiers::MOD1);
        assert!(variants.iter().all(|m| m.contains(Modifiers::MOD1)));
        assert_eq!(variants[3], Modifiers::MOD1 | Modifiers::MOD2 | Modifiers::LOCK);
    }
}
