//! Keyboard input and the sheet key map.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const fn none() -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub const fn shift() -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: true,
        }
    }

    pub const fn ctrl() -> Self {
        Self {
            ctrl: true,
            alt: false,
            shift: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: KeyCode) -> Self {
        Self::new(key, Modifiers::none())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetCommand {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    ExtendUp,
    ExtendDown,
    ExtendLeft,
    ExtendRight,
    NextColumn,
    PrevColumn,
    PatternStart,
    PatternEnd,
    PageUp,
    PageDown,
    Delete,
    Backspace,
    ToggleReplace,
    Cancel,
    EditTrigger,
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    SelectAll,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    WidenColumns,
    NarrowColumns,
    ResetColumnWidth,
    ToggleGrid,
    ToggleEdit,
    ConvertSetSlide,
}

fn parse_command(action: &str) -> Option<SheetCommand> {
    use SheetCommand::*;
    let cmd = match action {
        "cursor_up" => CursorUp,
        "cursor_down" => CursorDown,
        "cursor_left" => CursorLeft,
        "cursor_right" => CursorRight,
        "extend_up" => ExtendUp,
        "extend_down" => ExtendDown,
        "extend_left" => ExtendLeft,
        "extend_right" => ExtendRight,
        "next_column" => NextColumn,
        "prev_column" => PrevColumn,
        "pattern_start" => PatternStart,
        "pattern_end" => PatternEnd,
        "page_up" => PageUp,
        "page_down" => PageDown,
        "delete" => Delete,
        "backspace" => Backspace,
        "toggle_replace" => ToggleReplace,
        "cancel" => Cancel,
        "edit_trigger" => EditTrigger,
        "undo" => Undo,
        "redo" => Redo,
        "cut" => Cut,
        "copy" => Copy,
        "paste" => Paste,
        "select_all" => SelectAll,
        "zoom_in" => ZoomIn,
        "zoom_out" => ZoomOut,
        "zoom_reset" => ZoomReset,
        "widen_columns" => WidenColumns,
        "narrow_columns" => NarrowColumns,
        "reset_column_width" => ResetColumnWidth,
        "toggle_grid" => ToggleGrid,
        "toggle_edit" => ToggleEdit,
        "convert_set_slide" => ConvertSetSlide,
        _ => return None,
    };
    Some(cmd)
}

/// Parse `"Ctrl+Shift+z"`, `"Up"`, `"+"` and friends.
fn parse_key(s: &str) -> Option<KeyPress> {
    let mut modifiers = Modifiers::none();
    let mut rest = s;
    loop {
        if let Some(r) = rest.strip_prefix("Ctrl+").filter(|r| !r.is_empty()) {
            modifiers.ctrl = true;
            rest = r;
        } else if let Some(r) = rest.strip_prefix("Alt+").filter(|r| !r.is_empty()) {
            modifiers.alt = true;
            rest = r;
        } else if let Some(r) = rest.strip_prefix("Shift+").filter(|r| !r.is_empty()) {
            modifiers.shift = true;
            rest = r;
        } else {
            break;
        }
    }
    let key = match rest {
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Enter" => KeyCode::Enter,
        "Escape" => KeyCode::Escape,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        "Insert" => KeyCode::Insert,
        "Delete" => KeyCode::Delete,
        "Space" => KeyCode::Char(' '),
        _ => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(KeyPress::new(key, modifiers))
}

#[derive(Deserialize)]
struct KeymapFile {
    bindings: Vec<RawBinding>,
}

#[derive(Deserialize)]
struct RawBinding {
    key: String,
    action: String,
}

const DEFAULT_KEYBINDINGS: &str = include_str!("../../keybindings.toml");

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyPress, SheetCommand>,
}

impl Keymap {
    /// Embedded bindings, with entries from the user's keybindings file
    /// replacing those for the same key.
    pub fn load() -> Self {
        let mut keymap = Self::embedded();
        if let Some(path) = user_keybindings_path().filter(|p| p.exists()) {
            match std::fs::read_to_string(&path) {
                Ok(contents) => keymap.merge_toml(&contents),
                Err(e) => {
                    log::warn!(target: "keys", "could not read {}: {}", path.display(), e)
                }
            }
        }
        keymap
    }

    pub fn embedded() -> Self {
        let mut keymap = Self::default();
        keymap.merge_toml(DEFAULT_KEYBINDINGS);
        keymap
    }

    pub fn merge_toml(&mut self, contents: &str) {
        let file = match toml::from_str::<KeymapFile>(contents) {
            Ok(file) => file,
            Err(e) => {
                log::warn!(target: "keys", "ignoring malformed key bindings: {}", e);
                return;
            }
        };
        for raw in file.bindings {
            let Some(press) = parse_key(&raw.key) else {
                log::warn!(target: "keys", "ignoring unknown key '{}'", raw.key);
                continue;
            };
            let Some(command) = parse_command(&raw.action) else {
                log::warn!(target: "keys", "ignoring unknown action '{}'", raw.action);
                continue;
            };
            self.bindings.insert(press, command);
        }
    }

    pub fn lookup(&self, press: KeyPress) -> Option<SheetCommand> {
        self.bindings.get(&press).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn user_keybindings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kunquat").join("keybindings.toml"))
}
