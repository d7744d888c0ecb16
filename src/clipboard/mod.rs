//! The OS clipboard as a side channel: port, snapshots, the restore guard and
//! the passive prompt-prefill peek.

mod guard;
mod sync;
#[cfg(feature = "desktop")]
mod system;

pub use guard::ClipboardGuard;
pub use sync::ClipboardSync;
#[cfg(feature = "desktop")]
pub use system::SystemClipboard;

use crate::error::PlatformError;

/// RGBA pixels copied off the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// What the clipboard holds, reduced to the formats this app can put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardContent {
    Empty,
    Text(String),
    Image(ClipboardImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardKind {
    Empty,
    Text,
    Image,
}

impl ClipboardContent {
    pub fn kind(&self) -> ClipboardKind {
        match self {
            ClipboardContent::Empty => ClipboardKind::Empty,
            ClipboardContent::Text(_) => ClipboardKind::Text,
            ClipboardContent::Image(_) => ClipboardKind::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClipboardContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Access to the shared system clipboard.
///
/// Reads report "nothing in that format" as `Ok(None)`; an `Err` means the
/// clipboard itself could not be opened.
pub trait ClipboardPort: Send + Sync {
    fn read_text(&self) -> Result<Option<String>, PlatformError>;
    fn read_image(&self) -> Result<Option<ClipboardImage>, PlatformError>;
    fn write_text(&self, text: &str) -> Result<(), PlatformError>;
    fn write_image(&self, image: &ClipboardImage) -> Result<(), PlatformError>;
    fn clear(&self) -> Result<(), PlatformError>;

    fn contains_text(&self) -> bool {
        matches!(self.read_text(), Ok(Some(_)))
    }

    fn contains_image(&self) -> bool {
        matches!(self.read_image(), Ok(Some(_)))
    }
}

/// Clipboard content saved at the start of a clipboard-mutating operation.
///
/// Never leaves the operation that took it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    content: ClipboardContent,
}

impl ClipboardSnapshot {
    /// Text wins over image when the clipboard offers both, matching what a
    /// paste into a text field would produce.
    pub fn take(clipboard: &dyn ClipboardPort) -> Result<Self, PlatformError> {
        let content = if let Some(text) = clipboard.read_text()? {
            ClipboardContent::Text(text)
        } else if let Some(image) = clipboard.read_image()? {
            ClipboardContent::Image(image)
        } else {
            ClipboardContent::Empty
        };
        Ok(Self { content })
    }

    pub fn kind(&self) -> ClipboardKind {
        self.content.kind()
    }

    pub fn content(&self) -> &ClipboardContent {
        &self.content
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// Put the saved content back; an empty snapshot clears the clipboard.
    pub fn restore(&self, clipboard: &dyn ClipboardPort) -> Result<(), PlatformError> {
        match &self.content {
            ClipboardContent::Empty => clipboard.clear(),
            ClipboardContent::Text(text) => clipboard.write_text(text),
            ClipboardContent::Image(image) => clipboard.write_image(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClipboard, Trace};

    #[test]
    fn snapshot_prefers_text() {
        let clipboard = FakeClipboard::new(Trace::default(), ClipboardContent::Text("x".into()));
        let snapshot = ClipboardSnapshot::take(&clipboard).unwrap();
        assert_eq!(snapshot.kind(), ClipboardKind::Text);
        assert_eq!(snapshot.text(), Some("x"));
    }

    #[test]
    fn snapshot_of_image_and_empty() {
        let image = ClipboardImage { width: 1, height: 1, rgba: vec![1, 2, 3, 4] };
        let clipboard =
            FakeClipboard::new(Trace::default(), ClipboardContent::Image(image.clone()));
        let snapshot = ClipboardSnapshot::take(&clipboard).unwrap();
        assert_eq!(snapshot.content(), &ClipboardContent::Image(image));

        let clipboard = FakeClipboard::new(Trace::default(), ClipboardContent::Empty);
        assert_eq!(
            ClipboardSnapshot::take(&clipboard).unwrap().kind(),
            ClipboardKind::Empty
        );
    }

    #[test]
    fn restoring_empty_clears() {
        let clipboard = FakeClipboard::new(Trace::default(), ClipboardContent::Empty);
        let snapshot = ClipboardSnapshot::take(&clipboard).unwrap();
        clipboard.write_text("temporary").unwrap();
        snapshot.restore(&clipboard).unwrap();
        assert_eq!(clipboard.content(), ClipboardContent::Empty);
    }
}
