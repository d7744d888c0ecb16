//! Stand-ins for platforms without a queryable accessibility tree or
//! foreground-window activation. macOS and Linux hand focus back to the
//! previous application when our popup hides.

use std::time::Duration;

use super::{AccessibilityProvider, ElementFilter, WindowFocus, WindowHandle};
use crate::error::PlatformError;

#[derive(Debug, Default)]
pub struct NoAccessibility;

impl AccessibilityProvider for NoAccessibility {
    fn focused_selection(&self) -> Result<Option<String>, PlatformError> {
        Err(PlatformError::AccessibilityUnavailable(
            "no accessibility backend on this platform".into(),
        ))
    }

    fn descendant_selection(
        &self,
        _window: WindowHandle,
        _filter: ElementFilter,
        _budget: Duration,
    ) -> Result<Option<String>, PlatformError> {
        Err(PlatformError::AccessibilityUnavailable(
            "no accessibility backend on this platform".into(),
        ))
    }

    fn can_query(&self, _window: WindowHandle) -> bool {
        false
    }
}

/// Reports no foreground window and treats activation as already done.
#[derive(Debug, Default)]
pub struct PassiveFocus;

impl WindowFocus for PassiveFocus {
    fn foreground(&self) -> Result<WindowHandle, PlatformError> {
        Ok(WindowHandle::NONE)
    }

    fn activate(&self, _window: WindowHandle) -> Result<(), PlatformError> {
        Ok(())
    }
}
