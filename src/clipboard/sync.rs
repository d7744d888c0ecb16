use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::platform::Desktop;

/// Prefills the prompt box with whatever the user copied before switching to
/// the app window.
///
/// Peeks are read-only and run behind the same cycle lock as capture and
/// injection. While a cycle holds the lock the peek is skipped rather than
/// queued, so it can never sample a clipboard that is mid-swap.
pub struct ClipboardSync {
    enabled: AtomicBool,
    last_synced: Mutex<Option<String>>,
}

impl ClipboardSync {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            last_synced: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Automatic peek on window focus gain.
    ///
    /// Returns text only when it is non-blank and differs from what was last
    /// handed out. With `only_if_empty`, a prompt that already has text is
    /// left alone.
    pub fn peek(&self, desktop: &Desktop, current_text: &str, only_if_empty: bool) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        self.read(desktop, current_text, only_if_empty)
    }

    /// Manual "sync" button: works even when automatic sync is off and
    /// re-delivers text that was already synced once.
    pub fn force_peek(&self, desktop: &Desktop, current_text: &str, only_if_empty: bool) -> Option<String> {
        if let Ok(mut last) = self.last_synced.lock() {
            *last = None;
        }
        self.read(desktop, current_text, only_if_empty)
    }

    fn read(&self, desktop: &Desktop, current_text: &str, only_if_empty: bool) -> Option<String> {
        if only_if_empty && !current_text.trim().is_empty() {
            return None;
        }

        let Some(_cycle) = desktop.try_begin_cycle() else {
            debug!("Clipboard peek skipped: capture or paste in progress");
            return None;
        };

        let text = match desktop.clipboard.read_text() {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => return None,
            Err(e) => {
                debug!("Could not read clipboard: {}", e);
                return None;
            }
        };

        let mut last = self.last_synced.lock().ok()?;
        if last.as_deref() == Some(text.as_str()) {
            return None;
        }
        *last = Some(text.clone());
        Some(text)
    }
}
