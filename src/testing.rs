//! In-memory stand-ins for the OS ports, recording every call into a shared
//! trace so tests can assert on ordering across adapters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clipboard::{ClipboardContent, ClipboardImage, ClipboardPort};
use crate::error::PlatformError;
use crate::platform::{
    AccessibilityProvider, Chord, Desktop, ElementFilter, InputSynthesizer, WindowFocus,
    WindowHandle,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsCall {
    ClipboardRead,
    ClipboardWrite(ClipboardContent),
    ClipboardClear,
    Chord(Chord),
    Foreground,
    Activate(WindowHandle),
    FocusedSelection,
    DescendantSelection(ElementFilter),
}

#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<OsCall>>>);

impl Trace {
    pub fn push(&self, call: OsCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<OsCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, call: &OsCall) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub fn contains(&self, call: &OsCall) -> bool {
        self.position(call).is_some()
    }
}

pub struct FakeClipboard {
    trace: Trace,
    content: Mutex<ClipboardContent>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeClipboard {
    pub fn new(trace: Trace, content: ClipboardContent) -> Self {
        Self {
            trace,
            content: Mutex::new(content),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn content(&self) -> ClipboardContent {
        self.content.lock().unwrap().clone()
    }

    /// Replace the content without recording a call, as another process would.
    pub fn set_content(&self, content: ClipboardContent) {
        *self.content.lock().unwrap() = content;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), PlatformError> {
        self.trace.push(OsCall::ClipboardRead);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PlatformError::ClipboardUnavailable("locked".into()));
        }
        Ok(())
    }

    fn write(&self, content: ClipboardContent) -> Result<(), PlatformError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlatformError::ClipboardUnavailable("locked".into()));
        }
        if content == ClipboardContent::Empty {
            self.trace.push(OsCall::ClipboardClear);
        } else {
            self.trace.push(OsCall::ClipboardWrite(content.clone()));
        }
        self.set_content(content);
        Ok(())
    }
}

impl ClipboardPort for FakeClipboard {
    fn read_text(&self) -> Result<Option<String>, PlatformError> {
        self.check_read()?;
        Ok(self.content().as_text().map(str::to_string))
    }

    fn read_image(&self) -> Result<Option<ClipboardImage>, PlatformError> {
        self.check_read()?;
        match self.content() {
            ClipboardContent::Image(image) => Ok(Some(image)),
            _ => Ok(None),
        }
    }

    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        self.write(ClipboardContent::Text(text.to_string()))
    }

    fn write_image(&self, image: &ClipboardImage) -> Result<(), PlatformError> {
        self.write(ClipboardContent::Image(image.clone()))
    }

    fn clear(&self) -> Result<(), PlatformError> {
        self.write(ClipboardContent::Empty)
    }
}

/// Keyboard that plays the part of the focused application: a copy chord puts
/// `selection` on the clipboard, if there is one.
pub struct FakeKeyboard {
    trace: Trace,
    clipboard: Arc<FakeClipboard>,
    selection: Mutex<Option<String>>,
    fail: AtomicBool,
}

impl FakeKeyboard {
    pub fn set_selection(&self, selection: Option<&str>) {
        *self.selection.lock().unwrap() = selection.map(str::to_string);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl InputSynthesizer for FakeKeyboard {
    fn send_chord(&self, chord: Chord, _key_gap: Duration) -> Result<(), PlatformError> {
        self.trace.push(OsCall::Chord(chord));
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::InputSynthesisFailed("no input queue".into()));
        }
        if chord == Chord::Copy {
            if let Some(text) = self.selection.lock().unwrap().clone() {
                self.clipboard.set_content(ClipboardContent::Text(text));
            }
        }
        Ok(())
    }
}

pub struct FakeFocus {
    trace: Trace,
    current: Mutex<WindowHandle>,
    fail_activate: AtomicBool,
}

impl FakeFocus {
    pub fn set_foreground(&self, window: WindowHandle) {
        *self.current.lock().unwrap() = window;
    }

    pub fn current(&self) -> WindowHandle {
        *self.current.lock().unwrap()
    }

    pub fn fail_activate(&self, fail: bool) {
        self.fail_activate.store(fail, Ordering::SeqCst);
    }
}

impl WindowFocus for FakeFocus {
    fn foreground(&self) -> Result<WindowHandle, PlatformError> {
        self.trace.push(OsCall::Foreground);
        Ok(self.current())
    }

    fn activate(&self, window: WindowHandle) -> Result<(), PlatformError> {
        self.trace.push(OsCall::Activate(window));
        if self.fail_activate.load(Ordering::SeqCst) {
            return Err(PlatformError::FocusUnavailable("refused".into()));
        }
        self.set_foreground(window);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAccessibilityState {
    pub focused: Option<String>,
    pub keyboard_focused: Option<String>,
    pub text_selectable: Option<String>,
    pub unavailable: bool,
    pub skip_queries: bool,
    /// Descendant searches block for their whole budget, like a large tree.
    pub exhaust_budget: bool,
}

pub struct FakeAccessibility {
    trace: Trace,
    state: Mutex<FakeAccessibilityState>,
    budgets: Mutex<Vec<Duration>>,
}

impl FakeAccessibility {
    pub fn update(&self, f: impl FnOnce(&mut FakeAccessibilityState)) {
        f(&mut self.state.lock().unwrap());
    }

    /// Budgets handed to descendant searches, in call order.
    pub fn budgets(&self) -> Vec<Duration> {
        self.budgets.lock().unwrap().clone()
    }

    fn answer(&self, value: Option<String>) -> Result<Option<String>, PlatformError> {
        if self.state.lock().unwrap().unavailable {
            return Err(PlatformError::AccessibilityUnavailable("no provider".into()));
        }
        Ok(value)
    }
}

impl AccessibilityProvider for FakeAccessibility {
    fn focused_selection(&self) -> Result<Option<String>, PlatformError> {
        self.trace.push(OsCall::FocusedSelection);
        let value = self.state.lock().unwrap().focused.clone();
        self.answer(value)
    }

    fn descendant_selection(
        &self,
        _window: WindowHandle,
        filter: ElementFilter,
        budget: Duration,
    ) -> Result<Option<String>, PlatformError> {
        self.trace.push(OsCall::DescendantSelection(filter));
        self.budgets.lock().unwrap().push(budget);
        let (value, exhaust) = {
            let state = self.state.lock().unwrap();
            let value = match filter {
                ElementFilter::KeyboardFocused => state.keyboard_focused.clone(),
                ElementFilter::TextSelectable => state.text_selectable.clone(),
            };
            (value, state.exhaust_budget)
        };
        if exhaust {
            std::thread::sleep(budget);
            return Ok(None);
        }
        self.answer(value)
    }

    fn can_query(&self, _window: WindowHandle) -> bool {
        !self.state.lock().unwrap().skip_queries
    }
}

/// A [`Desktop`] wired to fakes that share one trace.
pub struct FakeDesk {
    pub desktop: Desktop,
    pub clipboard: Arc<FakeClipboard>,
    pub keyboard: Arc<FakeKeyboard>,
    pub focus: Arc<FakeFocus>,
    pub accessibility: Arc<FakeAccessibility>,
    pub trace: Trace,
}

impl FakeDesk {
    pub fn with_clipboard(content: ClipboardContent) -> Self {
        let trace = Trace::default();
        let clipboard = Arc::new(FakeClipboard::new(trace.clone(), content));
        let keyboard = Arc::new(FakeKeyboard {
            trace: trace.clone(),
            clipboard: clipboard.clone(),
            selection: Mutex::new(None),
            fail: AtomicBool::new(false),
        });
        let focus = Arc::new(FakeFocus {
            trace: trace.clone(),
            current: Mutex::new(WindowHandle::from_raw(0x100)),
            fail_activate: AtomicBool::new(false),
        });
        let accessibility = Arc::new(FakeAccessibility {
            trace: trace.clone(),
            state: Mutex::new(FakeAccessibilityState::default()),
            budgets: Mutex::new(Vec::new()),
        });
        let desktop = Desktop::new(
            clipboard.clone(),
            keyboard.clone(),
            focus.clone(),
            accessibility.clone(),
        );
        Self { desktop, clipboard, keyboard, focus, accessibility, trace }
    }
}
