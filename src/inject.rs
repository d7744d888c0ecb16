//! Text Injection Engine: puts a result back into the application the
//! selection came from.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::thread;

use crate::clipboard::ClipboardGuard;
use crate::config::CaptureTimings;
use crate::error::PlatformError;
use crate::platform::{Chord, Desktop, WindowHandle};
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectMode {
    /// Paste over the selection in the target window, then restore the
    /// clipboard.
    Replace,
    /// Leave the text on the clipboard for the user to paste.
    ClipboardOnly,
}

/// What to do with a finished result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PasteBehavior {
    AutoPaste,
    ClipboardMode,
    #[default]
    ReviewMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum Delivery {
    Pasted,
    Copied,
    /// Shown in the popup for the user to copy by hand.
    Review(String),
    Nothing,
    Failed(String),
}

pub fn inject(
    desktop: &Desktop,
    text: &str,
    target: WindowHandle,
    mode: InjectMode,
    timings: &CaptureTimings,
) -> Result<(), PlatformError> {
    let _cycle = desktop.begin_cycle();
    match mode {
        InjectMode::ClipboardOnly => desktop.clipboard.write_text(text),
        InjectMode::Replace => paste_into(desktop, text, target, timings),
    }
}

fn paste_into(
    desktop: &Desktop,
    text: &str,
    target: WindowHandle,
    timings: &CaptureTimings,
) -> Result<(), PlatformError> {
    let guard = ClipboardGuard::acquire(desktop.clipboard.as_ref())?;

    guard.clipboard().write_text(text)?;
    thread::sleep(timings.pre_paste());

    // Synthesized keys land in whichever window holds focus.
    if !target.is_none() {
        let current = desktop.focus.foreground()?;
        if current != target {
            debug!("Returning focus to {:#x}", target.raw());
            desktop.focus.activate(target)?;
        }
    }

    desktop.keyboard.send_chord(Chord::Paste, timings.key_gap())?;
    thread::sleep(timings.paste_settle());
    Ok(())
}

/// Normalize a finished response and route it per `behavior`. Injection
/// failures are reported, never raised.
pub fn deliver(
    desktop: &Desktop,
    raw: &str,
    target: WindowHandle,
    behavior: PasteBehavior,
    timings: &CaptureTimings,
) -> Delivery {
    let text = text::process_response(raw);
    if text.is_empty() {
        return Delivery::Nothing;
    }

    let mode = match behavior {
        PasteBehavior::ReviewMode => return Delivery::Review(text.into_string()),
        PasteBehavior::AutoPaste => InjectMode::Replace,
        PasteBehavior::ClipboardMode => InjectMode::ClipboardOnly,
    };

    match inject(desktop, text.as_str(), target, mode, timings) {
        Ok(()) => {
            info!("Delivered {} chars ({:?})", text.as_str().chars().count(), mode);
            match mode {
                InjectMode::Replace => Delivery::Pasted,
                InjectMode::ClipboardOnly => Delivery::Copied,
            }
        }
        Err(e) => {
            warn!("Failed to deliver result: {}", e);
            Delivery::Failed(e.to_string())
        }
    }
}
