//! Ports onto the OS facilities the capture and paste cycles drive, plus the
//! [`Desktop`] bundle that serializes access to them.

#[cfg(feature = "desktop")]
mod keyboard;
#[cfg(not(all(windows, feature = "desktop")))]
mod unsupported;
#[cfg(all(windows, feature = "desktop"))]
mod windows;

#[cfg(feature = "desktop")]
pub use keyboard::EnigoKeyboard;
#[cfg(not(all(windows, feature = "desktop")))]
pub use unsupported::{NoAccessibility, PassiveFocus};
#[cfg(all(windows, feature = "desktop"))]
pub use self::windows::{ForegroundFocus, UiAutomation};

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use crate::clipboard::ClipboardPort;
use crate::error::PlatformError;

/// Opaque OS window handle, passed by value and only meaningful for the
/// capture/paste cycle that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub const NONE: WindowHandle = WindowHandle(0);

    pub fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> isize {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Clipboard key chords the cycles synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chord {
    Copy,
    Paste,
}

impl Chord {
    pub fn letter(self) -> char {
        match self {
            Chord::Copy => 'c',
            Chord::Paste => 'v',
        }
    }
}

/// Synthesizes key events into the OS input queue. Keys go to whichever
/// window holds focus, never to a particular handle.
pub trait InputSynthesizer: Send + Sync {
    /// Press the platform command modifier, tap the chord letter, release,
    /// waiting `key_gap` between each event.
    fn send_chord(&self, chord: Chord, key_gap: Duration) -> Result<(), PlatformError>;
}

/// Foreground-window query and activation.
pub trait WindowFocus: Send + Sync {
    fn foreground(&self) -> Result<WindowHandle, PlatformError>;

    /// Make `window` the foreground window. Returns once the OS accepted the
    /// request.
    fn activate(&self, window: WindowHandle) -> Result<(), PlatformError>;
}

/// Which descendants of the foreground window to search for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFilter {
    /// Elements that still report keyboard focus.
    KeyboardFocused,
    /// Any element exposing a text-selection capability.
    TextSelectable,
}

/// Read-only view of the OS accessibility tree.
///
/// Implementations must not change clipboard, focus or input state.
pub trait AccessibilityProvider: Send + Sync {
    /// Selected text of the focused element. `Ok(None)` when the element has
    /// no text-selection capability or nothing is selected.
    fn focused_selection(&self) -> Result<Option<String>, PlatformError>;

    /// First non-empty selection among descendants of `window` matching
    /// `filter`, giving up after `budget`.
    fn descendant_selection(
        &self,
        window: WindowHandle,
        filter: ElementFilter,
        budget: Duration,
    ) -> Result<Option<String>, PlatformError>;

    /// Some applications hang accessibility queries; those are skipped.
    fn can_query(&self, _window: WindowHandle) -> bool {
        true
    }
}

pub type CycleGuard<'a> = MutexGuard<'a, ()>;

/// The shared OS resources one capture or paste cycle drives, and the lock
/// that keeps cycles from overlapping.
pub struct Desktop {
    pub clipboard: Arc<dyn ClipboardPort>,
    pub keyboard: Arc<dyn InputSynthesizer>,
    pub focus: Arc<dyn WindowFocus>,
    pub accessibility: Arc<dyn AccessibilityProvider>,
    cycle: Mutex<()>,
}

impl Desktop {
    pub fn new(
        clipboard: Arc<dyn ClipboardPort>,
        keyboard: Arc<dyn InputSynthesizer>,
        focus: Arc<dyn WindowFocus>,
        accessibility: Arc<dyn AccessibilityProvider>,
    ) -> Self {
        Self {
            clipboard,
            keyboard,
            focus,
            accessibility,
            cycle: Mutex::new(()),
        }
    }

    /// Block until no other cycle is running. A cycle that panicked left
    /// nothing behind in the lock, so poisoning is ignored.
    pub fn begin_cycle(&self) -> CycleGuard<'_> {
        self.cycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `None` while another cycle is running.
    pub fn try_begin_cycle(&self) -> Option<CycleGuard<'_>> {
        match self.cycle.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardContent;
    use crate::testing::FakeDesk;

    #[test]
    fn cycles_are_exclusive() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Empty);
        let first = desk.desktop.begin_cycle();
        assert!(desk.desktop.try_begin_cycle().is_none());
        drop(first);
        assert!(desk.desktop.try_begin_cycle().is_some());
    }

    #[test]
    fn window_handle_none() {
        assert!(WindowHandle::NONE.is_none());
        assert!(!WindowHandle::from_raw(42).is_none());
        assert_eq!(WindowHandle::from_raw(42).raw(), 42);
    }
}
