//! Customizable keybindings for the annotator.
//!
//! Keys are plain characters as reported by the host (`KeyboardEvent.key` on
//! the web, a typed character on native). Letters match case-insensitively.

use serde::{Deserialize, Serialize};

use crate::model::HealthLabel;

/// Number of category hotkey slots, one per health label.
pub const CATEGORY_HOTKEYS: usize = 3;

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }
}

/// What a bound key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    SelectCategory(HealthLabel),
    SelectErase,
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ResetView,
}

/// Target for keybind capture - which binding is being set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeybindTarget {
    /// Binding for a category by index (0-based)
    Category(usize),
    Erase,
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ResetView,
}

/// Keybinding configuration for the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Hotkeys for category selection (good, moderate, bad).
    /// None means no hotkey assigned for that slot
    pub category_hotkeys: [Option<char>; CATEGORY_HOTKEYS],
    /// Switch to erase mode
    pub erase: char,
    /// Undo; with shift held it redoes
    pub undo: char,
    pub redo: char,
    pub zoom_in: char,
    pub zoom_out: char,
    pub reset_view: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            category_hotkeys: [Some('1'), Some('2'), Some('3')],
            erase: 'e',
            undo: 'z',
            redo: 'y',
            zoom_in: '+',
            zoom_out: '-',
            reset_view: '0',
        }
    }
}

fn same_key(a: char, b: char) -> bool {
    a.to_lowercase().eq(b.to_lowercase())
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the action for a key press, if any.
    pub fn action_for_key(&self, key: char, modifiers: Modifiers) -> Option<KeyAction> {
        if modifiers.alt {
            return None;
        }
        if same_key(key, self.undo) {
            return Some(if modifiers.shift {
                KeyAction::Redo
            } else {
                KeyAction::Undo
            });
        }
        if same_key(key, self.redo) {
            return Some(KeyAction::Redo);
        }
        // Browser shortcuts (ctrl+1, ctrl+-) stay with the browser
        if modifiers.ctrl || modifiers.meta {
            return None;
        }
        if let Some(index) = self.category_index_for_key(key) {
            return HealthLabel::from_index(index).map(KeyAction::SelectCategory);
        }
        if same_key(key, self.erase) {
            Some(KeyAction::SelectErase)
        } else if key == self.zoom_in || (self.zoom_in == '+' && key == '=') {
            Some(KeyAction::ZoomIn)
        } else if key == self.zoom_out {
            Some(KeyAction::ZoomOut)
        } else if key == self.reset_view {
            Some(KeyAction::ResetView)
        } else {
            None
        }
    }

    /// Get the category index (0-based) that corresponds to a key press, if any.
    pub fn category_index_for_key(&self, key: char) -> Option<usize> {
        self.category_hotkeys
            .iter()
            .position(|hotkey| hotkey.is_some_and(|k| same_key(k, key)))
    }

    /// Get the hotkey for a category at a specific index, if any.
    pub fn key_for_category_index(&self, index: usize) -> Option<char> {
        self.category_hotkeys.get(index).copied().flatten()
    }

    /// Get the key currently bound to a target.
    pub fn key_for(&self, target: KeybindTarget) -> Option<char> {
        match target {
            KeybindTarget::Category(i) => self.key_for_category_index(i),
            KeybindTarget::Erase => Some(self.erase),
            KeybindTarget::Undo => Some(self.undo),
            KeybindTarget::Redo => Some(self.redo),
            KeybindTarget::ZoomIn => Some(self.zoom_in),
            KeybindTarget::ZoomOut => Some(self.zoom_out),
            KeybindTarget::ResetView => Some(self.reset_view),
        }
    }

    /// Rebind a target. Clearing is only possible for category slots.
    pub fn set_key(&mut self, target: KeybindTarget, key: Option<char>) {
        match (target, key) {
            (KeybindTarget::Category(i), key) => {
                if i < CATEGORY_HOTKEYS {
                    self.category_hotkeys[i] = key;
                }
            }
            (_, None) => {}
            (KeybindTarget::Erase, Some(k)) => self.erase = k,
            (KeybindTarget::Undo, Some(k)) => self.undo = k,
            (KeybindTarget::Redo, Some(k)) => self.redo = k,
            (KeybindTarget::ZoomIn, Some(k)) => self.zoom_in = k,
            (KeybindTarget::ZoomOut, Some(k)) => self.zoom_out = k,
            (KeybindTarget::ResetView, Some(k)) => self.reset_view = k,
        }
    }

    /// Check if a key is already used by any binding other than `exclude`.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, key: char, exclude: Option<KeybindTarget>) -> Option<String> {
        let named = [
            (KeybindTarget::Erase, "Erase mode"),
            (KeybindTarget::Undo, "Undo"),
            (KeybindTarget::Redo, "Redo"),
            (KeybindTarget::ZoomIn, "Zoom in"),
            (KeybindTarget::ZoomOut, "Zoom out"),
            (KeybindTarget::ResetView, "Reset view"),
        ];
        for (target, name) in named {
            if exclude != Some(target) && self.key_for(target).is_some_and(|k| same_key(k, key)) {
                return Some(name.to_string());
            }
        }

        for (i, hotkey) in self.category_hotkeys.iter().enumerate() {
            if exclude == Some(KeybindTarget::Category(i)) {
                continue;
            }
            if hotkey.is_some_and(|k| same_key(k, key)) {
                let name = HealthLabel::from_index(i).map(|l| l.name()).unwrap_or("Category");
                return Some(format!("{} category", name));
            }
        }

        None
    }
}

/// Convert an optional key to a display string.
pub fn key_to_string(key: Option<char>) -> String {
    match key {
        Some(' ') => "Space".to_string(),
        Some(k) => k.to_uppercase().collect(),
        None => "-".to_string(),
    }
}
