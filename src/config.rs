//! Configuration system for lwm
//!
//! Loads `KEY value` lines and `BIND <mods> <keysym> <command>` lines from
//! `~/.config/lwm.conf`. Auto-generates the default file on first run if
//! missing. A bad line is logged and skipped; it never stops the rest of the
//! file from loading.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::wm::keyboard::{Action, KeyBind, Keybindings, Modifiers};
use crate::wm::keysyms::keysym_from_name;

/// File written on first run
pub const DEFAULT_CONFIG: &str = "\
BAR_COLOR           #4C837E
BG_COLOR            #83A597
BORDER_COLOR        #555555
ACTIVE_BORDER_COLOR #4C837E
BUTTON_COLOR        #e8e4cf
TEXT_COLOR          #FFFFFF
LINE_COLOR          #FFFFFF
HIGHLIGHT_COLOR     #6CA39E
FONT                fixed
MOUSE_MOD           Mod1
BORDER_WIDTH        1
BIND Mod4 Return xterm
BIND Mod4 d dmenu_run
BIND Mod1 Tab alttab
BIND Mod4 Tab menu
BIND Mod4 q quit
BIND Mod4 c close
BIND Mod4 f fullscreen
BIND Mod4 u unhide
BIND Mod4 Left snap_left
BIND Mod4 Right snap_right
BIND Mod4 Up maximize
BIND Mod4 Down restore
";

/// Why a configuration line was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("missing value for `{0}`")]
    MissingValue(String),
    #[error("invalid number `{value}` for `{key}`")]
    InvalidNumber { key: String, value: String },
    #[error("invalid color `{value}` for `{key}`, using black")]
    InvalidColor { key: String, value: String },
    #[error("BIND needs a modifier, a keysym and a command")]
    IncompleteBind,
    #[error("unknown keysym `{0}`")]
    UnknownKeysym(String),
    #[error("too many bindings (limit {0})")]
    TooManyBinds(usize),
}

/// Resolved colors as pixel values (`0xRRGGBB`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colors {
    pub bar: u32,
    pub background: u32,
    pub border: u32,
    pub active_border: u32,
    pub button: u32,
    pub text: u32,
    pub line: u32,
    pub highlight: u32,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            bar: 0x4C837E,
            background: 0x83A597,
            border: 0x555555,
            active_border: 0x4C837E,
            button: 0xE8E4CF,
            text: 0xFFFFFF,
            line: 0xFFFFFF,
            highlight: 0x6CA39E,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub colors: Colors,
    /// Core font name
    pub font: String,
    /// Modifier that turns a button press into a move/resize
    pub mouse_modifier: Modifiers,
    pub border_width: u32,
    pub keybindings: Keybindings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            colors: Colors::default(),
            font: "fixed".to_string(),
            mouse_modifier: Modifiers::MOD1,
            border_width: 1,
            keybindings: Keybindings::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location), writing the
    /// default file first if it doesn't exist. Falls back to the contents of
    /// the default file when nothing can be read.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Ok(path) => path,
                Err(e) => {
                    warn!("{:#}, using defaults", e);
                    return Self::builtin();
                }
            },
        };

        if !path.exists() {
            info!("Config file not found at {:?}, creating it", path);
            if let Err(e) = Self::save_default(&path) {
                warn!("Failed to create default config file: {:#}", e);
            }
        }

        match Self::read(&path) {
            Ok(config) => {
                info!(
                    "Configuration loaded from {:?} ({} bindings)",
                    path,
                    config.keybindings.len()
                );
                config
            }
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::builtin()
            }
        }
    }

    /// The default file's settings and bindings, without touching disk
    pub fn builtin() -> Self {
        Self::parse(DEFAULT_CONFIG)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Ok(Self::parse(&content))
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("lwm.conf"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(path, DEFAULT_CONFIG).context("Failed to write default config file")?;
        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Parse a whole file, skipping bad lines
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for (number, line) in content.lines().enumerate() {
            if let Err(e) = config.apply_line(line) {
                warn!("Config line {}: {}", number + 1, e);
            }
        }
        debug!("Config: {:?}", config);
        config
    }

    /// Apply one line to the configuration
    pub fn apply_line(&mut self, line: &str) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let (key, rest) = split_token(line);
        if key == "BIND" {
            return self.apply_bind(rest);
        }

        let (value, _) = split_token(rest);
        if value.is_empty() {
            return Err(ConfigError::MissingValue(key.to_string()));
        }

        let color = |slot: &mut u32| -> Result<(), ConfigError> {
            match parse_color(value) {
                Some(pixel) => {
                    *slot = pixel;
                    Ok(())
                }
                None => {
                    *slot = 0;
                    Err(ConfigError::InvalidColor {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                }
            }
        };

        match key {
            "BAR_COLOR" => color(&mut self.colors.bar),
            "BG_COLOR" => color(&mut self.colors.background),
            "BORDER_COLOR" => color(&mut self.colors.border),
            "ACTIVE_BORDER_COLOR" => color(&mut self.colors.active_border),
            "BUTTON_COLOR" => color(&mut self.colors.button),
            "TEXT_COLOR" => color(&mut self.colors.text),
            "LINE_COLOR" => color(&mut self.colors.line),
            "HIGHLIGHT_COLOR" => color(&mut self.colors.highlight),
            "FONT" => {
                self.font = value.to_string();
                Ok(())
            }
            "MOUSE_MOD" => {
                let mods = Modifiers::from_names(value);
                self.mouse_modifier = if mods.is_empty() {
                    Modifiers::MOD1
                } else {
                    mods
                };
                Ok(())
            }
            "BORDER_WIDTH" => {
                self.border_width = value.parse().map_err(|_| ConfigError::InvalidNumber {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                Ok(())
            }
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    fn apply_bind(&mut self, rest: &str) -> Result<(), ConfigError> {
        let (mods, rest) = split_token(rest);
        let (key, command) = split_token(rest);
        let command = command.trim();
        if mods.is_empty() || key.is_empty() || command.is_empty() {
            return Err(ConfigError::IncompleteBind);
        }

        let keysym = keysym_from_name(key).ok_or_else(|| ConfigError::UnknownKeysym(key.to_string()))?;
        let bind = KeyBind {
            modifiers: Modifiers::from_names(mods),
            keysym,
            action: Action::parse(command),
        };

        if !self.keybindings.push(bind) {
            return Err(ConfigError::TooManyBinds(Keybindings::MAX_BINDS));
        }
        Ok(())
    }
}

/// Split off the first whitespace-delimited token
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

/// Parse `#RRGGBB` into a pixel value
pub fn parse_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::keysyms::{XK_RETURN, XK_TAB};
    use crate::wm::placement::SnapDirection;

    #[test]
    fn test_default_file_parses_cleanly() {
        let mut config = Config::default();
        for line in DEFAULT_CONFIG.lines() {
            assert_eq!(config.apply_line(line), Ok(()), "line: {}", line);
        }
        assert_eq!(config.keybindings.len(), 12);
        assert_eq!(config.colors, Colors::default());
        assert_eq!(config.mouse_modifier, Modifiers::MOD1);

        let first = config.keybindings.iter().next().unwrap();
        assert_eq!(first.modifiers, Modifiers::MOD4);
        assert_eq!(first.keysym, XK_RETURN);
        assert_eq!(first.action, Action::Spawn("xterm".to_string()));

        let alttab = config.keybindings.resolve(XK_TAB, Modifiers::MOD1.bits()).unwrap();
        assert_eq!(alttab.action, Action::AltTab);
    }

    #[test]
    fn test_bind_keeps_rest_of_line_as_command() {
        let mut config = Config::default();
        config
            .apply_line("BIND Mod4+Shift Return   xterm -e htop --tree")
            .unwrap();
        let bind = config.keybindings.iter().next().unwrap();
        assert_eq!(bind.modifiers, Modifiers::MOD4 | Modifiers::SHIFT);
        assert_eq!(bind.action, Action::Spawn("xterm -e htop --tree".to_string()));

        config.apply_line("BIND Mod4 Down Restore").unwrap();
        let bind = config.keybindings.iter().nth(1).unwrap();
        assert_eq!(bind.action, Action::Snap(SnapDirection::Restore));
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let content = "\
# comment
BORDER_WIDTH wide
BIND Mod4 NoSuchKey xterm
BIND Mod4 d
NOT_A_KEY 1
FONT
BORDER_WIDTH 3
BIND Mod4 d dmenu_run
";
        let config = Config::parse(content);
        assert_eq!(config.border_width, 3);
        assert_eq!(config.keybindings.len(), 1);
    }

    #[test]
    fn test_line_errors() {
        let mut config = Config::default();
        assert_eq!(
            config.apply_line("BIND Mod4 NoSuchKey xterm"),
            Err(ConfigError::UnknownKeysym("NoSuchKey".to_string()))
        );
        assert_eq!(config.apply_line("BIND Mod4"), Err(ConfigError::IncompleteBind));
        assert_eq!(
            config.apply_line("FONT"),
            Err(ConfigError::MissingValue("FONT".to_string()))
        );
        assert!(matches!(
            config.apply_line("BORDER_WIDTH -2"),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_invalid_color_resolves_to_black() {
        let mut config = Config::default();
        assert!(config.apply_line("BAR_COLOR #12345").is_err());
        assert_eq!(config.colors.bar, 0);
        config.apply_line("TEXT_COLOR #0a0B0c").unwrap();
        assert_eq!(config.colors.text, 0x0A0B0C);
    }

    #[test]
    fn test_mouse_mod_falls_back_to_mod1() {
        let mut config = Config::default();
        config.apply_line("MOUSE_MOD Mod4").unwrap();
        assert_eq!(config.mouse_modifier, Modifiers::MOD4);
        config.apply_line("MOUSE_MOD Hyper").unwrap();
        assert_eq!(config.mouse_modifier, Modifiers::MOD1);
    }

    #[test]
    fn test_bind_table_limit() {
        let mut config = Config::default();
        for _ in 0..Keybindings::MAX_BINDS {
            config.apply_line("BIND Mod4 x true").unwrap();
        }
        assert_eq!(
            config.apply_line("BIND Mod4 y true"),
            Err(ConfigError::TooManyBinds(Keybindings::MAX_BINDS))
        );
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#4C837E"), Some(0x4C837E));
        assert_eq!(parse_color("4C837E"), None);
        assert_eq!(parse_color("#GGGGGG"), None);
        assert_eq!(parse_color("#FFF"), None);
    }

    #[test]
    fn test_unreadable_file_keeps_default_bindings() {
        let dir = std::env::temp_dir().join(format!("lwm-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        // A directory cannot be read as a config file
        let config = Config::load(Some(dir.as_path()));
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(config.keybindings.len(), Config::builtin().keybindings.len());
        let quit = config
            .keybindings
            .iter()
            .find(|b| b.action == Action::Quit)
            .expect("quit binding");
        assert_eq!(quit.modifiers, Modifiers::MOD4);
        assert!(config.keybindings.iter().any(|b| b.action == Action::AltTab));
    }
}
