use arboard::{Clipboard, ImageData};
use std::borrow::Cow;
use std::sync::Mutex;

use super::{ClipboardImage, ClipboardPort};
use crate::error::PlatformError;

/// [`ClipboardPort`] over the OS clipboard.
///
/// The handle is opened on first use and kept: on X11 the text this app
/// writes is only served while a handle is alive.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(
        &self,
        op: impl FnOnce(&mut Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, arboard::Error> {
        let mut handle = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        let mut clipboard = match handle.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new()?,
        };
        let result = op(&mut clipboard);
        *handle = Some(clipboard);
        result
    }
}

fn unavailable(e: arboard::Error) -> PlatformError {
    PlatformError::ClipboardUnavailable(e.to_string())
}

/// Only "nothing in this format" is absence. A clipboard held by another
/// process is an error, so callers never mistake it for an empty one.
fn absent_or_unavailable<T>(result: Result<T, arboard::Error>) -> Result<Option<T>, PlatformError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(e) => Err(unavailable(e)),
    }
}

impl ClipboardPort for SystemClipboard {
    fn read_text(&self) -> Result<Option<String>, PlatformError> {
        absent_or_unavailable(self.with(|clipboard| clipboard.get_text()))
    }

    fn read_image(&self) -> Result<Option<ClipboardImage>, PlatformError> {
        let image = absent_or_unavailable(self.with(|clipboard| clipboard.get_image()))?;
        Ok(image.map(|image| ClipboardImage {
            width: image.width as u32,
            height: image.height as u32,
            rgba: image.bytes.into_owned(),
        }))
    }

    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        self.with(|clipboard| clipboard.set_text(text))
            .map_err(unavailable)
    }

    fn write_image(&self, image: &ClipboardImage) -> Result<(), PlatformError> {
        let data = ImageData {
            width: image.width as usize,
            height: image.height as usize,
            bytes: Cow::Borrowed(&image.rgba),
        };
        self.with(|clipboard| clipboard.set_image(data))
            .map_err(unavailable)
    }

    fn clear(&self) -> Result<(), PlatformError> {
        self.with(|clipboard| clipboard.clear()).map_err(unavailable)
    }
}
