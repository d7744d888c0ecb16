use log::{debug, warn};

use super::{ClipboardPort, ClipboardSnapshot};
use crate::error::PlatformError;

/// Scoped snapshot/restore of the system clipboard.
///
/// The snapshot is taken on [`ClipboardGuard::acquire`] and written back when
/// the guard is dropped, on every exit path including early returns and
/// unwinding. A failed restore is logged and swallowed: another process may
/// own the clipboard by then.
pub struct ClipboardGuard<'a> {
    clipboard: &'a dyn ClipboardPort,
    snapshot: ClipboardSnapshot,
}

impl<'a> ClipboardGuard<'a> {
    /// Fails when the clipboard cannot be read, in which case nothing that
    /// would need restoring has happened yet.
    pub fn acquire(clipboard: &'a dyn ClipboardPort) -> Result<Self, PlatformError> {
        let snapshot = ClipboardSnapshot::take(clipboard)?;
        debug!("Clipboard snapshot taken ({:?})", snapshot.kind());
        Ok(Self { clipboard, snapshot })
    }

    pub fn snapshot(&self) -> &ClipboardSnapshot {
        &self.snapshot
    }

    pub fn clipboard(&self) -> &'a dyn ClipboardPort {
        self.clipboard
    }
}

impl Drop for ClipboardGuard<'_> {
    fn drop(&mut self) {
        match self.snapshot.restore(self.clipboard) {
            Ok(()) => debug!("Clipboard restored ({:?})", self.snapshot.kind()),
            Err(e) => warn!("Failed to restore clipboard: {}", e),
        }
    }
}
