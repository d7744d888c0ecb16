//! Selection Capture Engine: reads whatever the user has selected in the
//! foreground application.

use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use crate::clipboard::ClipboardGuard;
use crate::config::CaptureTimings;
use crate::error::PlatformError;
use crate::platform::{Chord, Desktop, ElementFilter, WindowHandle};

/// How a capture obtained its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Read from the accessibility tree without touching input or clipboard.
    Accessibility,
    /// Copy chord into the foreground app, sampled off a guarded clipboard.
    KeyboardSimulation,
    None,
}

/// Outcome of one hotkey trigger, consumed once by the prompt UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub text: String,
    pub foreground_window: WindowHandle,
    pub strategy_used: Strategy,
}

impl CaptureResult {
    fn miss(foreground_window: WindowHandle) -> Self {
        Self {
            text: String::new(),
            foreground_window,
            strategy_used: Strategy::None,
        }
    }
}

/// The last [`CaptureResult`], held between the hotkey trigger and the UI.
///
/// Text is handed out once, and the paste target belongs to a single
/// delivery. A window handle never outlives the cycle that recorded it.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    current: Mutex<Option<CaptureResult>>,
}

impl CaptureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, result: CaptureResult) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(result);
    }

    pub fn clear(&self) {
        self.current.lock().unwrap_or_else(|p| p.into_inner()).take();
    }

    /// The captured text, empty after the first call.
    pub fn take_text(&self) -> String {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        current
            .as_mut()
            .map(|result| std::mem::take(&mut result.text))
            .unwrap_or_default()
    }

    /// The window to paste into. Consumes the capture, so a second delivery
    /// gets [`WindowHandle::NONE`].
    pub fn take_target(&self) -> WindowHandle {
        self.current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .map(|result| result.foreground_window)
            .unwrap_or_default()
    }
}

pub struct SelectionCapture {
    strategies: Vec<Strategy>,
    timings: Mutex<CaptureTimings>,
    enabled: AtomicBool,
}

impl Default for SelectionCapture {
    fn default() -> Self {
        Self::new(CaptureTimings::default())
    }
}

impl SelectionCapture {
    /// Accessibility first, then the keyboard fallback.
    pub fn new(timings: CaptureTimings) -> Self {
        Self::with_strategies(
            vec![Strategy::Accessibility, Strategy::KeyboardSimulation],
            timings,
        )
    }

    pub fn with_strategies(strategies: Vec<Strategy>, timings: CaptureTimings) -> Self {
        Self {
            strategies,
            timings: Mutex::new(timings),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_timings(&self, timings: CaptureTimings) {
        if let Ok(mut current) = self.timings.lock() {
            *current = timings;
        }
    }

    pub fn timings(&self) -> CaptureTimings {
        self.timings.lock().map(|t| *t).unwrap_or_default()
    }

    /// Run the strategies in order until one yields text.
    ///
    /// Never fails: OS errors are logged and the next strategy is tried, and
    /// a complete miss is an empty result with [`Strategy::None`]. Blocks for
    /// the configured settle delays, so call it off the async runtime.
    pub fn capture(&self, desktop: &Desktop) -> CaptureResult {
        let _cycle = desktop.begin_cycle();

        let window = match desktop.focus.foreground() {
            Ok(window) => window,
            Err(e) => {
                warn!("Could not read foreground window: {}", e);
                WindowHandle::NONE
            }
        };

        if !self.is_enabled() {
            debug!("Selection capture disabled");
            return CaptureResult::miss(window);
        }

        let timings = self.timings();
        for strategy in &self.strategies {
            match self.attempt(*strategy, desktop, window, &timings) {
                Ok(Some(text)) => {
                    info!("Captured {} chars via {:?}", text.chars().count(), strategy);
                    return CaptureResult {
                        text,
                        foreground_window: window,
                        strategy_used: *strategy,
                    };
                }
                Ok(None) => debug!("{:?} strategy found no selection", strategy),
                Err(e) => warn!("{:?} strategy failed: {}", strategy, e),
            }
        }

        info!("No selection captured");
        CaptureResult::miss(window)
    }

    fn attempt(
        &self,
        strategy: Strategy,
        desktop: &Desktop,
        window: WindowHandle,
        timings: &CaptureTimings,
    ) -> Result<Option<String>, PlatformError> {
        match strategy {
            Strategy::Accessibility => read_accessible_selection(desktop, window, timings),
            Strategy::KeyboardSimulation => copy_selection(desktop, timings),
            Strategy::None => Ok(None),
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}

/// Focused element first, then descendants of the foreground window: those
/// still holding keyboard focus, then anything with a text selection. Both
/// descendant searches share one `accessibility_budget`.
fn read_accessible_selection(
    desktop: &Desktop,
    window: WindowHandle,
    timings: &CaptureTimings,
) -> Result<Option<String>, PlatformError> {
    let accessibility = &desktop.accessibility;
    if !accessibility.can_query(window) {
        debug!("Accessibility skipped for this window");
        return Ok(None);
    }

    if let Some(text) = non_empty(accessibility.focused_selection()?) {
        return Ok(Some(text));
    }

    if window.is_none() {
        return Ok(None);
    }
    let deadline = Instant::now() + timings.accessibility_budget();
    for filter in [ElementFilter::KeyboardFocused, ElementFilter::TextSelectable] {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("Accessibility budget spent before {:?} search", filter);
            break;
        }
        let found = accessibility.descendant_selection(window, filter, remaining)?;
        if let Some(text) = non_empty(found) {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// Clear, copy, wait once, sample. A single bounded attempt: an application
/// slower than the settle delays is a miss.
fn copy_selection(
    desktop: &Desktop,
    timings: &CaptureTimings,
) -> Result<Option<String>, PlatformError> {
    let guard = ClipboardGuard::acquire(desktop.clipboard.as_ref())?;
    let clipboard = guard.clipboard();

    clipboard.clear()?;
    thread::sleep(timings.clear_settle());

    desktop.keyboard.send_chord(Chord::Copy, timings.key_gap())?;
    thread::sleep(timings.copy_settle());

    let copied = non_empty(clipboard.read_text()?);

    // Text identical to what was already on the clipboard cannot be told
    // apart from the application ignoring the chord.
    Ok(copied.filter(|text| guard.snapshot().text() != Some(text.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardContent, ClipboardImage};
    use crate::testing::{FakeDesk, OsCall};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn engine() -> SelectionCapture {
        SelectionCapture::new(CaptureTimings::instant())
    }

    fn clipboard_states() -> Vec<ClipboardContent> {
        vec![
            ClipboardContent::Empty,
            ClipboardContent::Text("x".into()),
            ClipboardContent::Image(ClipboardImage { width: 1, height: 2, rgba: vec![7; 8] }),
        ]
    }

    #[test]
    fn accessibility_hit_leaves_clipboard_alone() {
        for before in clipboard_states() {
            let desk = FakeDesk::with_clipboard(before.clone());
            desk.accessibility.update(|s| s.focused = Some("selected".into()));

            let result = engine().capture(&desk.desktop);

            assert_eq!(result.text, "selected");
            assert_eq!(result.strategy_used, Strategy::Accessibility);
            assert_eq!(desk.clipboard.content(), before);
            assert!(!desk.trace.contains(&OsCall::Chord(Chord::Copy)));
        }
    }

    #[test]
    fn keyboard_hit_restores_clipboard() {
        for before in clipboard_states() {
            let desk = FakeDesk::with_clipboard(before.clone());
            desk.keyboard.set_selection(Some("from copy"));

            let result = engine().capture(&desk.desktop);

            assert_eq!(result.text, "from copy");
            assert_eq!(result.strategy_used, Strategy::KeyboardSimulation);
            assert_eq!(desk.clipboard.content(), before);
        }
    }

    #[test]
    fn no_hit_restores_clipboard() {
        for before in clipboard_states() {
            let desk = FakeDesk::with_clipboard(before.clone());

            let result = engine().capture(&desk.desktop);

            assert_eq!(result.text, "");
            assert_eq!(result.strategy_used, Strategy::None);
            assert_eq!(desk.clipboard.content(), before);
        }
    }

    #[test]
    fn failed_chord_still_restores_clipboard() {
        for before in clipboard_states() {
            let desk = FakeDesk::with_clipboard(before.clone());
            desk.keyboard.fail(true);

            let result = engine().capture(&desk.desktop);

            assert_eq!(result.strategy_used, Strategy::None);
            assert_eq!(desk.clipboard.content(), before);
        }
    }

    #[test]
    fn clipboard_is_cleared_before_copy() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Text("old".into()));
        desk.keyboard.set_selection(Some("new"));

        engine().capture(&desk.desktop);

        let clear = desk.trace.position(&OsCall::ClipboardClear).unwrap();
        let copy = desk.trace.position(&OsCall::Chord(Chord::Copy)).unwrap();
        assert!(clear < copy);
    }

    #[test]
    fn selection_equal_to_old_clipboard_is_a_miss() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Text("same".into()));
        desk.keyboard.set_selection(Some("same"));

        let result = engine().capture(&desk.desktop);

        assert_eq!(result.strategy_used, Strategy::None);
        assert_eq!(desk.clipboard.content(), ClipboardContent::Text("same".into()));
    }

    #[test]
    fn descendant_search_order() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Empty);
        desk.accessibility.update(|s| {
            s.keyboard_focused = Some("focused child".into());
            s.text_selectable = Some("any child".into());
        });

        let result = engine().capture(&desk.desktop);
        assert_eq!(result.text, "focused child");

        desk.accessibility.update(|s| s.keyboard_focused = None);
        let result = engine().capture(&desk.desktop);
        assert_eq!(result.text, "any child");
        assert_eq!(result.strategy_used, Strategy::Accessibility);
    }

    #[test]
    fn descendant_searches_share_one_budget() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Text("x".into()));
        desk.accessibility.update(|s| s.exhaust_budget = true);
        desk.keyboard.set_selection(Some("typed"));
        let budget = Duration::from_millis(60);
        let engine = SelectionCapture::new(CaptureTimings {
            accessibility_budget: 60,
            ..CaptureTimings::instant()
        });

        let result = engine.capture(&desk.desktop);

        let handed: Duration = desk.accessibility.budgets().iter().sum();
        assert!(handed <= budget, "handed out {:?}", handed);
        assert_eq!(result.text, "typed");
        assert_eq!(result.strategy_used, Strategy::KeyboardSimulation);
    }

    #[test]
    fn whitespace_selection_is_a_hit() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Empty);
        desk.accessibility.update(|s| s.focused = Some("  ".into()));

        let result = engine().capture(&desk.desktop);

        assert_eq!(result.text, "  ");
        assert_eq!(result.strategy_used, Strategy::Accessibility);
    }

    #[test]
    fn occupied_clipboard_is_never_touched() {
        let before = ClipboardContent::Text("user data".into());
        let desk = FakeDesk::with_clipboard(before.clone());
        desk.clipboard.fail_reads(true);
        desk.keyboard.set_selection(Some("selected"));

        let result = engine().capture(&desk.desktop);

        assert_eq!(result.strategy_used, Strategy::None);
        assert_eq!(desk.clipboard.content(), before);
        assert!(!desk.trace.contains(&OsCall::ClipboardClear));
        assert!(!desk.trace.contains(&OsCall::Chord(Chord::Copy)));
    }

    #[test]
    fn unavailable_accessibility_falls_through() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Text("x".into()));
        desk.accessibility.update(|s| {
            s.unavailable = true;
            s.focused = Some("unreachable".into());
        });
        desk.keyboard.set_selection(Some("typed"));

        let result = engine().capture(&desk.desktop);

        assert_eq!(result.text, "typed");
        assert_eq!(result.strategy_used, Strategy::KeyboardSimulation);
    }

    #[test]
    fn skipped_windows_never_query_accessibility() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Empty);
        desk.accessibility.update(|s| {
            s.skip_queries = true;
            s.focused = Some("hidden".into());
        });

        let result = engine().capture(&desk.desktop);

        assert_eq!(result.strategy_used, Strategy::None);
        assert!(!desk.trace.contains(&OsCall::FocusedSelection));
    }

    #[test]
    fn records_foreground_window_first() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Empty);
        let target = WindowHandle::from_raw(0xBEEF);
        desk.focus.set_foreground(target);
        desk.accessibility.update(|s| s.focused = Some("hi".into()));

        let result = engine().capture(&desk.desktop);

        assert_eq!(result.foreground_window, target);
        assert_eq!(desk.trace.calls().first(), Some(&OsCall::Foreground));
    }

    #[test]
    fn slot_hands_out_text_once() {
        let slot = CaptureSlot::new();
        slot.store(CaptureResult {
            text: "picked".into(),
            foreground_window: WindowHandle::from_raw(0x42),
            strategy_used: Strategy::Accessibility,
        });

        assert_eq!(slot.take_text(), "picked");
        assert_eq!(slot.take_text(), "");
        assert_eq!(slot.take_target(), WindowHandle::from_raw(0x42));
    }

    #[test]
    fn slot_target_is_single_use() {
        let slot = CaptureSlot::new();
        assert_eq!(slot.take_target(), WindowHandle::NONE);

        slot.store(CaptureResult::miss(WindowHandle::from_raw(0x42)));
        assert_eq!(slot.take_target(), WindowHandle::from_raw(0x42));
        assert_eq!(slot.take_target(), WindowHandle::NONE);

        slot.store(CaptureResult::miss(WindowHandle::from_raw(0x43)));
        slot.clear();
        assert_eq!(slot.take_target(), WindowHandle::NONE);
    }

    #[test]
    fn disabled_capture_only_records_window() {
        let desk = FakeDesk::with_clipboard(ClipboardContent::Text("x".into()));
        desk.accessibility.update(|s| s.focused = Some("selected".into()));
        let engine = engine();
        engine.set_enabled(false);

        let result = engine.capture(&desk.desktop);

        assert_eq!(result, CaptureResult::miss(desk.focus.current()));
        assert_eq!(desk.trace.calls(), vec![OsCall::Foreground]);
    }
}
