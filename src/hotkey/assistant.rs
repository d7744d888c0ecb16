use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::error::Error;

use super::{BackendError, HotkeyBackend, HotkeyId, HotkeySpec, Key, Modifier, Modifiers};

/// Combinations the OS or the desktop shell keeps for itself.
const BLOCKLIST: &[(&str, &str)] = &[
    ("Alt+Space", "opens the window system menu"),
    ("Alt+F4", "closes the active window"),
    ("Ctrl+Alt+Delete", "reserved by the operating system"),
    ("Alt+Tab", "switches between windows"),
    ("Alt+Esc", "cycles through windows"),
    ("Ctrl+Esc", "opens the Start menu"),
    ("Alt+Enter", "toggles fullscreen and opens properties"),
    ("Meta+D", "shows the desktop"),
    ("Meta+E", "opens the file explorer"),
    ("Meta+L", "locks the computer"),
    ("Meta+R", "opens the Run dialog"),
    ("Meta+Tab", "opens task view"),
];

/// Why `spec` may not be used as a hotkey, if it is on the blocklist.
pub fn blocked_reason(spec: &HotkeySpec) -> Option<&'static str> {
    let canonical = spec.canonical();
    BLOCKLIST
        .iter()
        .find(|(combo, _)| *combo == canonical)
        .map(|(_, reason)| *reason)
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureRejection {
    #[error("{combo} is blocked: {reason}")]
    BlockedByPolicy { combo: String, reason: String },
    #[error("{combo} is already in use by another application")]
    Unavailable { combo: String },
    #[error("invalid hotkey: {message}")]
    InvalidCombination { message: String },
}

impl From<CaptureRejection> for Error {
    fn from(rejection: CaptureRejection) -> Self {
        match rejection {
            CaptureRejection::BlockedByPolicy { combo, reason } => {
                Error::BlockedByPolicy { combo, reason }
            }
            CaptureRejection::Unavailable { combo } => Error::RegistrationConflict(combo),
            CaptureRejection::InvalidCombination { message } => Error::InvalidCombination(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CaptureOutcome {
    /// Nothing decided yet: a lone modifier, no session, or a key that
    /// arrived while a probe was in flight.
    Ignored,
    Accepted { hotkey: HotkeySpec },
    Rejected { rejection: CaptureRejection },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssistantState {
    Idle,
    Capturing,
    Validating,
}

/// A key press as reported by the settings window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    /// DOM `key` or `code` value, e.g. `"a"`, `"KeyA"`, `" "`, `"ArrowUp"`.
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyInput {
    fn modifiers(&self) -> Modifiers {
        [
            (self.ctrl, Modifier::Ctrl),
            (self.alt, Modifier::Alt),
            (self.shift, Modifier::Shift),
            (self.meta, Modifier::Meta),
        ]
        .into_iter()
        .filter(|(held, _)| *held)
        .map(|(_, m)| m)
        .collect()
    }

    fn is_modifier(&self) -> bool {
        let key = self.key.trim();
        Modifier::parse(key).is_some()
            || matches!(key, "AltGraph" | "Hyper" | "Fn")
            || ["ControlLeft", "ControlRight", "AltLeft", "AltRight", "ShiftLeft", "ShiftRight", "MetaLeft", "MetaRight"]
                .contains(&key)
    }

    fn key(&self) -> Option<Key> {
        match self.key.as_str() {
            " " => Some(Key::Space),
            key => Key::parse(key),
        }
    }
}

/// Interactive hotkey recorder: `Idle -> Capturing -> Validating -> Idle`.
pub struct CaptureAssistant {
    backend: Arc<dyn HotkeyBackend>,
    probe_id: HotkeyId,
    state: Mutex<AssistantState>,
}

impl CaptureAssistant {
    pub fn new(backend: Arc<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            probe_id: HotkeyId::PROBE,
            state: Mutex::new(AssistantState::Idle),
        }
    }

    pub fn state(&self) -> AssistantState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Start a session. Returns `false` when one is already running.
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state != AssistantState::Idle {
            return false;
        }
        *state = AssistantState::Capturing;
        true
    }

    /// Abandon a capturing session. A probe in flight runs to completion.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state == AssistantState::Capturing {
            *state = AssistantState::Idle;
        }
    }

    /// Feed one key press. `current` is the hotkey in use right now, which is
    /// always accepted without a probe.
    pub fn record(&self, input: &KeyInput, current: Option<&HotkeySpec>) -> CaptureOutcome {
        let candidate = {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if *state != AssistantState::Capturing {
                debug!("Dropped key press while {:?}", *state);
                return CaptureOutcome::Ignored;
            }
            if input.is_modifier() {
                return CaptureOutcome::Ignored;
            }

            match check_candidate(input) {
                Ok(candidate) if current == Some(&candidate) => {
                    *state = AssistantState::Idle;
                    return CaptureOutcome::Accepted { hotkey: candidate };
                }
                Ok(candidate) => {
                    *state = AssistantState::Validating;
                    candidate
                }
                Err(rejection) => {
                    *state = AssistantState::Idle;
                    return CaptureOutcome::Rejected { rejection };
                }
            }
        };

        // The lock is released while the OS call runs so concurrent presses
        // observe `Validating` and are dropped instead of queueing.
        let outcome = self.probe(candidate);
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = AssistantState::Idle;
        outcome
    }

    /// Disposable register/unregister round-trip under the probe id.
    fn probe(&self, candidate: HotkeySpec) -> CaptureOutcome {
        match self.backend.register(self.probe_id, &candidate) {
            Ok(()) => {
                if let Err(e) = self.backend.unregister(self.probe_id) {
                    warn!("Failed to release probe for {}: {}", candidate, e);
                }
                info!("Hotkey {} is available", candidate);
                CaptureOutcome::Accepted { hotkey: candidate }
            }
            Err(BackendError::Refused(msg)) => {
                debug!("Probe for {} refused: {}", candidate, msg);
                CaptureOutcome::Rejected {
                    rejection: CaptureRejection::Unavailable { combo: candidate.canonical() },
                }
            }
            Err(BackendError::Unsupported(message)) => CaptureOutcome::Rejected {
                rejection: CaptureRejection::InvalidCombination { message },
            },
        }
    }
}

fn check_candidate(input: &KeyInput) -> Result<HotkeySpec, CaptureRejection> {
    let key = input.key().ok_or_else(|| CaptureRejection::InvalidCombination {
        message: format!("unsupported key \"{}\"", input.key),
    })?;
    let candidate = HotkeySpec::new(input.modifiers(), key);

    if candidate.modifiers.is_empty() && !key.is_function_key() {
        return Err(CaptureRejection::InvalidCombination {
            message: format!("{} needs at least one modifier", candidate),
        });
    }
    if let Some(reason) = blocked_reason(&candidate) {
        return Err(CaptureRejection::BlockedByPolicy {
            combo: candidate.canonical(),
            reason: reason.to_string(),
        });
    }
    Ok(candidate)
}
