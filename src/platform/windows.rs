//! UI Automation and foreground-window adapters for Windows.

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use ::windows::core::{VARIANT, PWSTR};
use ::windows::Win32::Foundation::{CloseHandle, HWND};
use ::windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED,
};
use ::windows::Win32::System::Threading::{
    AttachThreadInput, GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW,
    PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};
use ::windows::Win32::UI::Accessibility::{
    CUIAutomation8, IUIAutomation, IUIAutomationElement, IUIAutomationTextPattern,
    TreeScope_Descendants, UIA_HasKeyboardFocusPropertyId, UIA_IsTextPatternAvailablePropertyId,
    UIA_TextPatternId,
};
use ::windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowThreadProcessId, SetForegroundWindow,
};

use super::{AccessibilityProvider, ElementFilter, WindowFocus, WindowHandle};
use crate::error::PlatformError;

/// Processes whose accessibility tree is large enough that a descendant walk
/// stalls the capture.
const SKIPPED_PROCESSES: &[&str] = &["code.exe", "code - insiders.exe"];

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.raw() as *mut std::ffi::c_void)
}

fn unavailable(e: ::windows::core::Error) -> PlatformError {
    PlatformError::AccessibilityUnavailable(e.to_string())
}

/// Reads selections through UI Automation.
///
/// COM objects are not `Send`, so every query opens its own automation
/// client on the calling thread. At most one descendant walk runs at a time;
/// a walk abandoned at its deadline keeps the slot until `FindAll` returns.
#[derive(Debug, Default)]
pub struct UiAutomation {
    walking: Arc<AtomicBool>,
}

impl UiAutomation {
    pub fn new() -> Self {
        Self::default()
    }
}

// Frees the walk slot when the search thread finishes, however it finishes.
struct WalkSlot(Arc<AtomicBool>);

impl Drop for WalkSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn automation() -> Result<IUIAutomation, PlatformError> {
    unsafe {
        // S_FALSE and RPC_E_CHANGED_MODE both leave COM usable on this thread.
        let _ = CoInitializeEx(None, COINIT_MULTITHREADED);
        CoCreateInstance(&CUIAutomation8, None, CLSCTX_INPROC_SERVER).map_err(unavailable)
    }
}

fn selection_of(element: &IUIAutomationElement) -> Option<String> {
    unsafe {
        let pattern: IUIAutomationTextPattern =
            element.GetCurrentPatternAs(UIA_TextPatternId).ok()?;
        let ranges = pattern.GetSelection().ok()?;
        if ranges.Length().ok()? < 1 {
            return None;
        }
        let text = ranges.GetElement(0).ok()?.GetText(-1).ok()?.to_string();
        non_empty(text)
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn search_descendants(
    window: WindowHandle,
    filter: ElementFilter,
    deadline: Instant,
) -> Result<Option<String>, PlatformError> {
    let automation = automation()?;
    unsafe {
        let root = automation.ElementFromHandle(hwnd(window)).map_err(unavailable)?;
        if filter == ElementFilter::KeyboardFocused {
            if let Some(text) = selection_of(&root) {
                return Ok(Some(text));
            }
        }
        let property = match filter {
            ElementFilter::KeyboardFocused => UIA_HasKeyboardFocusPropertyId,
            ElementFilter::TextSelectable => UIA_IsTextPatternAvailablePropertyId,
        };
        let condition = automation
            .CreatePropertyCondition(property, &VARIANT::from(true))
            .map_err(unavailable)?;
        let elements = root
            .FindAll(TreeScope_Descendants, &condition)
            .map_err(unavailable)?;

        for i in 0..elements.Length().map_err(unavailable)? {
            if Instant::now() >= deadline {
                debug!("Accessibility search budget spent after {} elements", i);
                break;
            }
            let Ok(element) = elements.GetElement(i) else {
                continue;
            };
            if let Some(text) = selection_of(&element) {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

fn process_name(window: WindowHandle) -> Option<String> {
    unsafe {
        let mut pid = 0u32;
        GetWindowThreadProcessId(hwnd(window), Some(&mut pid as *mut u32));
        if pid == 0 {
            return None;
        }
        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        let queried =
            QueryFullProcessImageNameW(process, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut len);
        let _ = CloseHandle(process);
        queried.ok()?;
        let path = String::from_utf16_lossy(&buf[..len as usize]);
        path.rsplit('\\').next().map(|name| name.to_lowercase())
    }
}

impl AccessibilityProvider for UiAutomation {
    fn focused_selection(&self) -> Result<Option<String>, PlatformError> {
        let automation = automation()?;
        let element = unsafe { automation.GetFocusedElement() }.map_err(unavailable)?;
        Ok(selection_of(&element))
    }

    fn descendant_selection(
        &self,
        window: WindowHandle,
        filter: ElementFilter,
        budget: Duration,
    ) -> Result<Option<String>, PlatformError> {
        if window.is_none() {
            return Ok(None);
        }
        // FindAll itself can block well past the budget, so the walk runs on
        // its own thread and is abandoned when time is up.
        if self.walking.swap(true, Ordering::SeqCst) {
            debug!("Previous accessibility search still running, skipping");
            return Ok(None);
        }
        let slot = WalkSlot(self.walking.clone());
        let deadline = Instant::now() + budget;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _slot = slot;
            let _ = tx.send(search_descendants(window, filter, deadline));
        });
        match rx.recv_timeout(budget) {
            Ok(result) => result,
            Err(_) => {
                warn!("Accessibility search timed out after {:?}", budget);
                Ok(None)
            }
        }
    }

    fn can_query(&self, window: WindowHandle) -> bool {
        match process_name(window) {
            Some(name) if SKIPPED_PROCESSES.contains(&name.as_str()) => {
                debug!("Skipping accessibility for {}", name);
                false
            }
            _ => true,
        }
    }
}

/// Foreground window tracking through user32.
#[derive(Debug, Default)]
pub struct ForegroundFocus;

impl ForegroundFocus {
    pub fn new() -> Self {
        Self
    }
}

impl WindowFocus for ForegroundFocus {
    fn foreground(&self) -> Result<WindowHandle, PlatformError> {
        let current = unsafe { GetForegroundWindow() };
        Ok(WindowHandle::from_raw(current.0 as isize))
    }

    fn activate(&self, window: WindowHandle) -> Result<(), PlatformError> {
        if window.is_none() {
            return Err(PlatformError::FocusUnavailable("no target window".into()));
        }
        let target = hwnd(window);
        unsafe {
            if GetForegroundWindow() == target {
                return Ok(());
            }

            let target_thread = GetWindowThreadProcessId(target, None);
            let current_thread = GetCurrentThreadId();

            // SetForegroundWindow is refused across threads unless input is
            // attached to the target's queue first.
            let activated = if target_thread != current_thread {
                if AttachThreadInput(current_thread, target_thread, true).as_bool() {
                    let ok = SetForegroundWindow(target).as_bool();
                    let _ = AttachThreadInput(current_thread, target_thread, false);
                    ok
                } else {
                    false
                }
            } else {
                SetForegroundWindow(target).as_bool()
            };

            if activated {
                Ok(())
            } else {
                Err(PlatformError::FocusUnavailable(format!(
                    "could not activate window {:#x}",
                    window.raw()
                )))
            }
        }
    }
}
