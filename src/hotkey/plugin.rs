use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;
use tauri::{AppHandle, Runtime};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut};

use super::{BackendError, HotkeyBackend, HotkeyId, HotkeySpec, Key, Modifier};

/// [`HotkeyBackend`] over the global-shortcut plugin.
///
/// The plugin reports fired shortcuts by their own numeric id; [`resolve`]
/// maps that back to the reservation it was registered under.
///
/// [`resolve`]: GlobalShortcutBackend::resolve
pub struct GlobalShortcutBackend<R: Runtime> {
    app: AppHandle<R>,
    reservations: Mutex<HashMap<HotkeyId, Shortcut>>,
}

impl<R: Runtime> GlobalShortcutBackend<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self {
            app,
            reservations: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, shortcut: &Shortcut) -> Option<HotkeyId> {
        let reservations = self.reservations.lock().ok()?;
        reservations
            .iter()
            .find(|(_, registered)| registered.id() == shortcut.id())
            .map(|(id, _)| *id)
    }
}

/// Accelerator string in the plugin's own key vocabulary.
fn accelerator(spec: &HotkeySpec) -> Result<String, BackendError> {
    let mut parts: Vec<String> = spec
        .modifiers
        .iter()
        .map(|m| {
            match m {
                Modifier::Ctrl => "Control",
                Modifier::Alt => "Alt",
                Modifier::Shift => "Shift",
                Modifier::Meta => "Super",
            }
            .to_string()
        })
        .collect();

    let key = match spec.key {
        Key::Char(c) => c.to_string(),
        Key::Function(n) => format!("F{}", n),
        Key::Numpad(n) => format!("Numpad{}", n),
        Key::Up => "ArrowUp".into(),
        Key::Down => "ArrowDown".into(),
        Key::Left => "ArrowLeft".into(),
        Key::Right => "ArrowRight".into(),
        Key::Escape => "Escape".into(),
        // No physical `+` key; the numpad one is the only unshifted plus.
        Key::Symbol('+') => "NumpadAdd".into(),
        Key::Symbol(c) => match c {
            '-' => "Minus",
            ',' => "Comma",
            '.' => "Period",
            '/' => "Slash",
            ';' => "Semicolon",
            '\'' => "Quote",
            '[' => "BracketLeft",
            ']' => "BracketRight",
            '\\' => "Backslash",
            '`' => "Backquote",
            other => return Err(BackendError::Unsupported(format!("key {:?}", other))),
        }
        .into(),
        other => other.name(),
    };
    parts.push(key);
    Ok(parts.join("+"))
}

fn shortcut_for(spec: &HotkeySpec) -> Result<Shortcut, BackendError> {
    let accelerator = accelerator(spec)?;
    accelerator
        .parse::<Shortcut>()
        .map_err(|e| BackendError::Unsupported(format!("{}: {}", accelerator, e)))
}

impl<R: Runtime> HotkeyBackend for GlobalShortcutBackend<R> {
    fn register(&self, id: HotkeyId, spec: &HotkeySpec) -> Result<(), BackendError> {
        let shortcut = shortcut_for(spec)?;
        let global = self.app.global_shortcut();

        // Left behind by an earlier registration in this process.
        if global.is_registered(shortcut) {
            debug!("{} already registered, unregistering first", spec);
            let _ = global.unregister(shortcut);
        }

        global
            .register(shortcut)
            .map_err(|e| BackendError::Refused(e.to_string()))?;

        if let Ok(mut reservations) = self.reservations.lock() {
            reservations.insert(id, shortcut);
        }
        Ok(())
    }

    fn unregister(&self, id: HotkeyId) -> Result<(), BackendError> {
        let shortcut = match self.reservations.lock() {
            Ok(mut reservations) => reservations.remove(&id),
            Err(_) => None,
        };
        let Some(shortcut) = shortcut else {
            return Ok(());
        };
        self.app
            .global_shortcut()
            .unregister(shortcut)
            .map_err(|e| BackendError::Refused(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accel(raw: &str) -> String {
        accelerator(&HotkeySpec::parse(raw).unwrap()).unwrap()
    }

    #[test]
    fn accelerators_use_plugin_names() {
        assert_eq!(accel("Ctrl+Space"), "Control+Space");
        assert_eq!(accel("Win+Shift+Esc"), "Shift+Super+Escape");
        assert_eq!(accel("Alt+Up"), "Alt+ArrowUp");
        assert_eq!(accel("Ctrl++"), "Control+NumpadAdd");
        assert_eq!(accel("Ctrl+Num4"), "Control+Numpad4");
        assert_eq!(accel("Ctrl+;"), "Control+Semicolon");
    }

    #[test]
    fn every_accelerator_parses() {
        for raw in ["Ctrl+Space", "F13", "Ctrl+Alt+PageDown", "Meta+`", "Ctrl+Plus", "Alt+7"] {
            assert!(shortcut_for(&HotkeySpec::parse(raw).unwrap()).is_ok(), "{}", raw);
        }
    }
}
