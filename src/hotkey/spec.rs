use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::RegistrationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeySpecError {
    #[error("hotkey is empty")]
    Empty,
    #[error("\"{0}\" has no main key")]
    MissingKey(String),
    #[error("\"{0}\" has more than one main key")]
    MultipleKeys(String),
    #[error("unknown key \"{0}\"")]
    UnknownKey(String),
}

impl From<HotkeySpecError> for RegistrationError {
    fn from(err: HotkeySpecError) -> Self {
        RegistrationError::InvalidCombination(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    /// Canonical order.
    pub const ALL: [Modifier; 4] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift, Modifier::Meta];

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Alt => "Alt",
            Modifier::Shift => "Shift",
            Modifier::Meta => "Meta",
        }
    }

    pub fn parse(token: &str) -> Option<Modifier> {
        match token.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "alt" | "option" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            "meta" | "win" | "windows" | "super" | "cmd" | "command" | "os" => Some(Modifier::Meta),
            _ => None,
        }
    }
}

/// Set of held modifiers. Order-free; [`Modifiers::iter`] yields canonical
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);

    fn bit(modifier: Modifier) -> u8 {
        match modifier {
            Modifier::Ctrl => 1,
            Modifier::Alt => 2,
            Modifier::Shift => 4,
            Modifier::Meta => 8,
        }
    }

    pub fn with(self, modifier: Modifier) -> Self {
        Modifiers(self.0 | Self::bit(modifier))
    }

    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & Self::bit(modifier) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter().fold(Modifiers::NONE, Modifiers::with)
    }
}

/// Primary (non-modifier) key of a hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `A`–`Z` (upper case) or `0`–`9`.
    Char(char),
    /// `F1`–`F24`.
    Function(u8),
    /// Numpad `0`–`9`.
    Numpad(u8),
    Space,
    Enter,
    Tab,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Escape,
    /// One of ``+ - , . / ; ' [ ] \ ` ``.
    Symbol(char),
}

const SYMBOLS: &str = "+-,./;'[]\\`";

impl Key {
    pub fn parse(token: &str) -> Option<Key> {
        let upper = token.trim().to_ascii_uppercase();
        let mut chars = upper.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return match c {
                'A'..='Z' | '0'..='9' => Some(Key::Char(c)),
                c if SYMBOLS.contains(c) => Some(Key::Symbol(c)),
                _ => None,
            };
        }

        let key = match upper.as_str() {
            "SPACE" | "SPACEBAR" => Key::Space,
            "ENTER" | "RETURN" => Key::Enter,
            "TAB" => Key::Tab,
            "BACKSPACE" => Key::Backspace,
            "DELETE" | "DEL" => Key::Delete,
            "INSERT" | "INS" => Key::Insert,
            "HOME" => Key::Home,
            "END" => Key::End,
            "PAGEUP" | "PGUP" => Key::PageUp,
            "PAGEDOWN" | "PGDN" => Key::PageDown,
            "UP" | "ARROWUP" => Key::Up,
            "DOWN" | "ARROWDOWN" => Key::Down,
            "LEFT" | "ARROWLEFT" => Key::Left,
            "RIGHT" | "ARROWRIGHT" => Key::Right,
            "ESC" | "ESCAPE" => Key::Escape,
            "PLUS" | "%2B" => Key::Symbol('+'),
            "MINUS" => Key::Symbol('-'),
            "COMMA" => Key::Symbol(','),
            "PERIOD" => Key::Symbol('.'),
            "SLASH" => Key::Symbol('/'),
            "SEMICOLON" => Key::Symbol(';'),
            "QUOTE" => Key::Symbol('\''),
            "BRACKETLEFT" => Key::Symbol('['),
            "BRACKETRIGHT" => Key::Symbol(']'),
            "BACKSLASH" => Key::Symbol('\\'),
            "BACKQUOTE" => Key::Symbol('`'),
            other => return Self::parse_numbered(other),
        };
        Some(key)
    }

    // F1–F24, Num0–Num9 / Numpad0–Numpad9, and the DOM `KeyA` / `Digit1` codes.
    fn parse_numbered(upper: &str) -> Option<Key> {
        if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
            return (1..=24).contains(&n).then_some(Key::Function(n));
        }
        let digit = upper
            .strip_prefix("NUMPAD")
            .or_else(|| upper.strip_prefix("NUM"))
            .and_then(|n| n.parse::<u8>().ok());
        if let Some(n) = digit {
            return (n <= 9).then_some(Key::Numpad(n));
        }
        let code = upper
            .strip_prefix("KEY")
            .filter(|c| c.len() == 1 && c.chars().all(|c| c.is_ascii_uppercase()))
            .or_else(|| {
                upper
                    .strip_prefix("DIGIT")
                    .filter(|c| c.len() == 1 && c.chars().all(|c| c.is_ascii_digit()))
            })?;
        code.chars().next().map(Key::Char)
    }

    pub fn name(self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Function(n) => format!("F{}", n),
            Key::Numpad(n) => format!("Num{}", n),
            Key::Space => "Space".into(),
            Key::Enter => "Enter".into(),
            Key::Tab => "Tab".into(),
            Key::Backspace => "Backspace".into(),
            Key::Delete => "Delete".into(),
            Key::Insert => "Insert".into(),
            Key::Home => "Home".into(),
            Key::End => "End".into(),
            Key::PageUp => "PageUp".into(),
            Key::PageDown => "PageDown".into(),
            Key::Up => "Up".into(),
            Key::Down => "Down".into(),
            Key::Left => "Left".into(),
            Key::Right => "Right".into(),
            Key::Escape => "Esc".into(),
            // A bare `+` would read back as a separator.
            Key::Symbol('+') => "Plus".into(),
            Key::Symbol(c) => c.to_string(),
        }
    }

    pub fn is_function_key(self) -> bool {
        matches!(self, Key::Function(_))
    }
}

/// A global hotkey: modifier set plus one primary key.
///
/// Equality is equality of the canonical form, since parsing already folds
/// synonyms and modifier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HotkeySpec {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl HotkeySpec {
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }

    pub fn parse(raw: &str) -> Result<Self, HotkeySpecError> {
        let decoded = raw.trim().replace("%2B", "+").replace("%2b", "+");
        if decoded.is_empty() {
            return Err(HotkeySpecError::Empty);
        }

        // A trailing `++` (or a lone `+`) is the plus key itself.
        let (rest, trailing_plus) = if decoded == "+" {
            ("", true)
        } else if let Some(rest) = decoded.strip_suffix("++") {
            (rest, true)
        } else {
            (decoded.as_str(), false)
        };

        let mut modifiers = Modifiers::NONE;
        let mut key = trailing_plus.then_some(Key::Symbol('+'));

        for token in rest.split('+').map(str::trim).filter(|_| !rest.is_empty()) {
            if let Some(modifier) = Modifier::parse(token) {
                modifiers = modifiers.with(modifier);
                continue;
            }
            let parsed =
                Key::parse(token).ok_or_else(|| HotkeySpecError::UnknownKey(token.to_string()))?;
            if key.replace(parsed).is_some() {
                return Err(HotkeySpecError::MultipleKeys(raw.to_string()));
            }
        }

        let key = key.ok_or_else(|| HotkeySpecError::MissingKey(raw.to_string()))?;
        Ok(Self { modifiers, key })
    }

    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

/// Canonical `Ctrl+Alt+Shift+Meta+Key` form of a user- or config-supplied
/// hotkey string.
pub fn canonicalize(raw: &str) -> Result<String, HotkeySpecError> {
    HotkeySpec::parse(raw).map(|spec| spec.canonical())
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.iter() {
            write!(f, "{}+", modifier.name())?;
        }
        f.write_str(&self.key.name())
    }
}

impl FromStr for HotkeySpec {
    type Err = HotkeySpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HotkeySpec {
    type Error = HotkeySpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HotkeySpec> for String {
    fn from(spec: HotkeySpec) -> Self {
        spec.canonical()
    }
}
