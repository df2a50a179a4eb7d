//! Keysym names and values (X11/keysymdef.h, XF86keysym.h)
//!
//! Only the symbols that make sense in a key binding are listed; anything
//! else can still be bound by its numeric value (`0xff0d`).

pub const XK_BACKSPACE: u32 = 0xFF08;
pub const XK_TAB: u32 = 0xFF09;
pub const XK_RETURN: u32 = 0xFF0D;
pub const XK_ESCAPE: u32 = 0xFF1B;
pub const XK_DELETE: u32 = 0xFFFF;
pub const XK_HOME: u32 = 0xFF50;
pub const XK_LEFT: u32 = 0xFF51;
pub const XK_UP: u32 = 0xFF52;
pub const XK_RIGHT: u32 = 0xFF53;
pub const XK_DOWN: u32 = 0xFF54;
pub const XK_PAGE_UP: u32 = 0xFF55;
pub const XK_PAGE_DOWN: u32 = 0xFF56;
pub const XK_END: u32 = 0xFF57;
pub const XK_PRINT: u32 = 0xFF61;
pub const XK_INSERT: u32 = 0xFF63;
pub const XK_MENU: u32 = 0xFF67;
pub const XK_F1: u32 = 0xFFBE;

pub const XK_SHIFT_L: u32 = 0xFFE1;
pub const XK_SHIFT_R: u32 = 0xFFE2;
pub const XK_CONTROL_L: u32 = 0xFFE3;
pub const XK_CONTROL_R: u32 = 0xFFE4;
pub const XK_META_L: u32 = 0xFFE7;
pub const XK_META_R: u32 = 0xFFE8;
pub const XK_ALT_L: u32 = 0xFFE9;
pub const XK_ALT_R: u32 = 0xFFEA;
pub const XK_SUPER_L: u32 = 0xFFEB;
pub const XK_SUPER_R: u32 = 0xFFEC;
pub const XK_HYPER_L: u32 = 0xFFED;
pub const XK_HYPER_R: u32 = 0xFFEE;

pub const XK_J: u32 = 0x006A;
pub const XK_K: u32 = 0x006B;

const NAMED: &[(&str, u32)] = &[
    ("BackSpace", XK_BACKSPACE),
    ("Tab", XK_TAB),
    ("Return", XK_RETURN),
    ("Escape", XK_ESCAPE),
    ("Delete", XK_DELETE),
    ("Home", XK_HOME),
    ("Left", XK_LEFT),
    ("Up", XK_UP),
    ("Right", XK_RIGHT),
    ("Down", XK_DOWN),
    ("Prior", XK_PAGE_UP),
    ("Page_Up", XK_PAGE_UP),
    ("Next", XK_PAGE_DOWN),
    ("Page_Down", XK_PAGE_DOWN),
    ("End", XK_END),
    ("Print", XK_PRINT),
    ("Insert", XK_INSERT),
    ("Menu", XK_MENU),
    ("space", 0x0020),
    ("exclam", 0x0021),
    ("quotedbl", 0x0022),
    ("numbersign", 0x0023),
    ("dollar", 0x0024),
    ("percent", 0x0025),
    ("ampersand", 0x0026),
    ("apostrophe", 0x0027),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("asterisk", 0x002A),
    ("plus", 0x002B),
    ("comma", 0x002C),
    ("minus", 0x002D),
    ("period", 0x002E),
    ("slash", 0x002F),
    ("colon", 0x003A),
    ("semicolon", 0x003B),
    ("less", 0x003C),
    ("equal", 0x003D),
    ("greater", 0x003E),
    ("question", 0x003F),
    ("at", 0x0040),
    ("bracketleft", 0x005B),
    ("backslash", 0x005C),
    ("bracketright", 0x005D),
    ("asciicircum", 0x005E),
    ("underscore", 0x005F),
    ("grave", 0x0060),
    ("braceleft", 0x007B),
    ("bar", 0x007C),
    ("braceright", 0x007D),
    ("asciitilde", 0x007E),
    ("Shift_L", XK_SHIFT_L),
    ("Shift_R", XK_SHIFT_R),
    ("Control_L", XK_CONTROL_L),
    ("Control_R", XK_CONTROL_R),
    ("Meta_L", XK_META_L),
    ("Meta_R", XK_META_R),
    ("Alt_L", XK_ALT_L),
    ("Alt_R", XK_ALT_R),
    ("Super_L", XK_SUPER_L),
    ("Super_R", XK_SUPER_R),
    ("Hyper_L", XK_HYPER_L),
    ("Hyper_R", XK_HYPER_R),
    // XF86 media keys
    ("XF86AudioLowerVolume", 0x1008FF11),
    ("XF86AudioMute", 0x1008FF12),
    ("XF86AudioRaiseVolume", 0x1008FF13),
    ("XF86AudioPlay", 0x1008FF14),
    ("XF86AudioStop", 0x1008FF15),
    ("XF86AudioPrev", 0x1008FF16),
    ("XF86AudioNext", 0x1008FF17),
    ("XF86MonBrightnessUp", 0x1008FF02),
    ("XF86MonBrightnessDown", 0x1008FF03),
    ("XF86AudioMicMute", 0x1008FFB2),
];

/// Resolve a keysym name as written in the configuration file.
///
/// Letters are case sensitive (`a` and `A` are different symbols), like the
/// server's own name table.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(c as u32);
        }
    }

    if let Some((_, sym)) = NAMED.iter().find(|(n, _)| *n == name) {
        return Some(*sym);
    }

    // F1..F35 are contiguous
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=35).contains(&n) {
            return Some(XK_F1 + n - 1);
        }
    }

    let hex = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X"))?;
    u32::from_str_radix(hex, 16).ok().filter(|&sym| sym != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits() {
        assert_eq!(keysym_from_name("d"), Some(0x64));
        assert_eq!(keysym_from_name("D"), Some(0x44));
        assert_eq!(keysym_from_name("7"), Some(0x37));
        assert_eq!(keysym_from_name("j"), Some(XK_J));
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(keysym_from_name("Return"), Some(XK_RETURN));
        assert_eq!(keysym_from_name("Tab"), Some(XK_TAB));
        assert_eq!(keysym_from_name("Left"), Some(XK_LEFT));
        assert_eq!(keysym_from_name("space"), Some(0x20));
        assert_eq!(keysym_from_name("XF86AudioMute"), Some(0x1008FF12));
        // Names are case sensitive
        assert_eq!(keysym_from_name("return"), None);
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(keysym_from_name("F1"), Some(0xFFBE));
        assert_eq!(keysym_from_name("F4"), Some(0xFFC1));
        assert_eq!(keysym_from_name("F12"), Some(0xFFC9));
        assert_eq!(keysym_from_name("F0"), None);
        assert_eq!(keysym_from_name("F36"), None);
    }

    #[test]
    fn test_numeric_and_unknown() {
        assert_eq!(keysym_from_name("0xff0d"), Some(XK_RETURN));
        assert_eq!(keysym_from_name("0x0"), None);
        assert_eq!(keysym_from_name("NoSuchKey"), None);
        assert_eq!(keysym_from_name(""), None);
    }
}
