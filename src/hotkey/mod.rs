//! The single global hotkey: parsing, OS registration and the interactive
//! recorder used by the settings window.

mod assistant;
mod registrar;
mod spec;
#[cfg(feature = "desktop")]
mod plugin;

pub use assistant::{
    blocked_reason, AssistantState, CaptureAssistant, CaptureOutcome, CaptureRejection, KeyInput,
};
pub use registrar::{BackendError, HotkeyBackend, Registrar};
pub use spec::{canonicalize, HotkeySpec, HotkeySpecError, Key, Modifier, Modifiers};
#[cfg(feature = "desktop")]
pub use plugin::GlobalShortcutBackend;

/// Reservation id under which a hotkey is registered with the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyId(pub u32);

impl HotkeyId {
    /// The app's trigger hotkey.
    pub const PRIMARY: HotkeyId = HotkeyId(1);
    /// Disposable registration used to test whether a combination is free.
    pub const PROBE: HotkeyId = HotkeyId(2);
}
