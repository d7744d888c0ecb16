use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::inject::PasteBehavior;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    #[serde(default)]
    pub paste_behavior: PasteBehavior,
    #[serde(default = "default_true")]
    pub selection_capture_enabled: bool,
    #[serde(default = "default_true")]
    pub clipboard_sync_enabled: bool,
    #[serde(default)]
    pub enable_debug_logging: bool,
    #[serde(default = "default_popup_width")]
    pub popup_width: f64,
    #[serde(default)]
    pub timings: CaptureTimings,
}

fn default_hotkey() -> String {
    "Ctrl+Space".to_string()
}

fn default_true() -> bool {
    true
}

fn default_popup_width() -> f64 {
    500.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hotkey: default_hotkey(),
            paste_behavior: PasteBehavior::default(),
            selection_capture_enabled: true,
            clipboard_sync_enabled: true,
            enable_debug_logging: false,
            popup_width: default_popup_width(),
            timings: CaptureTimings::default(),
        }
    }
}

/// Settle delays around synthesized key events, in milliseconds.
///
/// The foreign application's event loop needs these to react before the
/// clipboard is sampled; slow machines may need them raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureTimings {
    /// After clearing the clipboard, before the copy chord.
    pub clear_settle: u64,
    /// Between individual key events of a chord.
    pub key_gap: u64,
    /// After the copy chord, before reading the clipboard.
    pub copy_settle: u64,
    /// After writing the result, before the paste chord.
    pub pre_paste: u64,
    /// After the paste chord, before the clipboard is restored.
    pub paste_settle: u64,
    /// Upper bound for one accessibility descendant search.
    pub accessibility_budget: u64,
}

impl Default for CaptureTimings {
    fn default() -> Self {
        Self {
            clear_settle: 100,
            key_gap: 10,
            copy_settle: 250,
            pre_paste: 50,
            paste_settle: 100,
            accessibility_budget: 2000,
        }
    }
}

impl CaptureTimings {
    pub fn clear_settle(&self) -> Duration {
        Duration::from_millis(self.clear_settle)
    }

    pub fn key_gap(&self) -> Duration {
        Duration::from_millis(self.key_gap)
    }

    pub fn copy_settle(&self) -> Duration {
        Duration::from_millis(self.copy_settle)
    }

    pub fn pre_paste(&self) -> Duration {
        Duration::from_millis(self.pre_paste)
    }

    pub fn paste_settle(&self) -> Duration {
        Duration::from_millis(self.paste_settle)
    }

    pub fn accessibility_budget(&self) -> Duration {
        Duration::from_millis(self.accessibility_budget)
    }

    /// No settle delays; tests drive fakes that react instantly. The
    /// accessibility budget is a ceiling, not a wait, so it keeps its default.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            clear_settle: 0,
            key_gap: 0,
            copy_settle: 0,
            pre_paste: 0,
            paste_settle: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn old_config_files_keep_loading() {
        let config: AppConfig = serde_json::from_str(r#"{"hotkey":"Alt+S"}"#).unwrap();
        assert_eq!(config.hotkey, "Alt+S");
        assert_eq!(config.paste_behavior, PasteBehavior::ReviewMode);
        assert!(config.selection_capture_enabled);
        assert_eq!(config.timings, CaptureTimings::default());
    }

    #[test]
    fn partial_timings_fill_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"timings":{"copy_settle":400}}"#).unwrap();
        assert_eq!(config.timings.copy_settle, 400);
        assert_eq!(config.timings.clear_settle, 100);
        assert_eq!(config.hotkey, "Ctrl+Space");
    }

    #[test]
    fn paste_behavior_is_camel_case() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(json["paste_behavior"], "reviewMode");
    }
}
