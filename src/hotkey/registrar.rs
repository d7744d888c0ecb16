use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::{HotkeyId, HotkeySpec};
use crate::error::RegistrationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The OS facility cannot express this combination.
    #[error("unsupported combination: {0}")]
    Unsupported(String),
    /// The OS refused the registration, normally because another program
    /// holds the combination.
    #[error("registration refused: {0}")]
    Refused(String),
}

/// OS global-hotkey facility, addressed by reservation id.
#[cfg_attr(test, mockall::automock)]
pub trait HotkeyBackend: Send + Sync {
    fn register(&self, id: HotkeyId, spec: &HotkeySpec) -> Result<(), BackendError>;

    /// Must succeed when nothing is registered under `id`.
    fn unregister(&self, id: HotkeyId) -> Result<(), BackendError>;
}

/// Owns the app's one global hotkey registration.
pub struct Registrar {
    id: HotkeyId,
    backend: Arc<dyn HotkeyBackend>,
    active: Mutex<Option<HotkeySpec>>,
    // Read by `dispatch` on the OS event thread, which must never wait on
    // `active` while a registration call is in flight.
    armed: AtomicBool,
}

impl Registrar {
    pub fn new(backend: Arc<dyn HotkeyBackend>) -> Self {
        Self::with_id(HotkeyId::PRIMARY, backend)
    }

    pub fn with_id(id: HotkeyId, backend: Arc<dyn HotkeyBackend>) -> Self {
        Self {
            id,
            backend,
            active: Mutex::new(None),
            armed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> HotkeyId {
        self.id
    }

    pub fn active(&self) -> Option<HotkeySpec> {
        self.active.lock().ok().and_then(|active| *active)
    }

    /// Replace whatever is registered under this registrar's id with `spec`.
    ///
    /// Always unregisters first, which also clears a registration a previous
    /// crashed run left behind.
    pub fn register(&self, spec: &HotkeySpec) -> Result<(), RegistrationError> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());

        if let Err(e) = self.backend.unregister(self.id) {
            debug!("Clearing stale hotkey registration failed: {}", e);
        }
        *active = None;
        self.armed.store(false, Ordering::SeqCst);

        self.backend.register(self.id, spec).map_err(|e| match e {
            BackendError::Unsupported(msg) => RegistrationError::InvalidCombination(msg),
            BackendError::Refused(msg) => {
                warn!("Hotkey {} refused: {}", spec, msg);
                RegistrationError::AlreadyBoundElsewhere(spec.canonical())
            }
        })?;

        info!("Registered hotkey {}", spec);
        *active = Some(*spec);
        self.armed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Move to `spec`, putting the previous registration back if the OS
    /// refuses the new one. Afterwards [`Registrar::active`] names whatever
    /// really is registered.
    pub fn switch_to(&self, spec: &HotkeySpec) -> Result<(), RegistrationError> {
        let previous = self.active();
        let err = match self.register(spec) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if let Some(previous) = previous {
            if let Err(e) = self.register(&previous) {
                warn!("Could not restore previous hotkey {}: {}", previous, e);
            }
        }
        Err(err)
    }

    /// Parse then [`Registrar::register`].
    pub fn register_str(&self, raw: &str) -> Result<HotkeySpec, RegistrationError> {
        let spec = HotkeySpec::parse(raw)?;
        self.register(&spec)?;
        Ok(spec)
    }

    /// No-op when nothing is registered.
    pub fn unregister(&self) -> Result<(), RegistrationError> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        let Some(spec) = active.take() else {
            return Ok(());
        };
        self.armed.store(false, Ordering::SeqCst);
        if let Err(e) = self.backend.unregister(self.id) {
            warn!("Failed to unregister hotkey {}: {}", spec, e);
        }
        Ok(())
    }

    /// Whether an OS hotkey event belongs to this registrar.
    pub fn dispatch(&self, id: HotkeyId) -> bool {
        id == self.id && self.armed.load(Ordering::SeqCst)
    }

    /// True when `spec` differs from the active registration, compared in
    /// canonical form.
    pub fn needs_update(&self, spec: &HotkeySpec) -> bool {
        self.active().as_ref() != Some(spec)
    }
}
