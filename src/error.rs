use thiserror::Error;

/// Failure of a single OS call made by an adapter.
///
/// Capture and injection swallow these after logging; they never reach the UI
/// as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("accessibility layer unavailable: {0}")]
    AccessibilityUnavailable(String),

    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("input synthesis failed: {0}")]
    InputSynthesisFailed(String),

    #[error("window focus unavailable: {0}")]
    FocusUnavailable(String),
}

/// Why the Registrar could not claim a hotkey.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("invalid hotkey combination: {0}")]
    InvalidCombination(String),

    #[error("\"{0}\" is already in use by another application")]
    AlreadyBoundElsewhere(String),
}

/// Every error kind the selection layer can report, flattened for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("\"{0}\" is already in use by another application")]
    RegistrationConflict(String),

    #[error("invalid hotkey combination: {0}")]
    InvalidCombination(String),

    #[error("\"{combo}\" is blocked: {reason}")]
    BlockedByPolicy { combo: String, reason: String },

    #[error("accessibility layer unavailable: {0}")]
    AccessibilityUnavailable(String),

    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("input synthesis failed: {0}")]
    InputSynthesisFailed(String),
}

impl From<RegistrationError> for Error {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::InvalidCombination(msg) => Error::InvalidCombination(msg),
            RegistrationError::AlreadyBoundElsewhere(combo) => Error::RegistrationConflict(combo),
        }
    }
}

impl From<PlatformError> for Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::AccessibilityUnavailable(msg) => Error::AccessibilityUnavailable(msg),
            PlatformError::ClipboardUnavailable(msg) => Error::ClipboardUnavailable(msg),
            // Focus is restored so keys reach the right window; a failure there
            // surfaces the same way a failed key event does.
            PlatformError::InputSynthesisFailed(msg) | PlatformError::FocusUnavailable(msg) => {
                Error::InputSynthesisFailed(msg)
            }
        }
    }
}
