use anyhow::Context;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use tauri::menu::{Menu, MenuItem};
use tauri::tray::{TrayIconBuilder, TrayIconEvent};
use tauri::{AppHandle, Emitter, Manager, State, WindowEvent, Wry};
use tauri_plugin_global_shortcut::ShortcutState;
use tauri_plugin_store::StoreExt;

use crate::capture::{CaptureResult, CaptureSlot, SelectionCapture};
use crate::clipboard::{ClipboardSync, SystemClipboard};
use crate::config::AppConfig;
use crate::error::Error;
use crate::hotkey::{
    CaptureAssistant, CaptureOutcome, GlobalShortcutBackend, HotkeySpec, KeyInput, Registrar,
};
use crate::inject::{self, Delivery};
use crate::logging;
use crate::platform::{Desktop, EnigoKeyboard};

const STORE_FILE: &str = "config.json";
const CONFIG_KEY: &str = "app_config";
const MAIN_WINDOW: &str = "main";

struct AppState {
    desktop: Arc<Desktop>,
    capture: SelectionCapture,
    sync: ClipboardSync,
    hotkeys: Arc<GlobalShortcutBackend<Wry>>,
    registrar: Registrar,
    assistant: CaptureAssistant,
    config: Mutex<AppConfig>,
}

impl AppState {
    fn config(&self) -> AppConfig {
        self.config.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Push settings that take effect without a restart.
    fn apply(&self, config: &AppConfig) {
        self.capture.set_enabled(config.selection_capture_enabled);
        self.capture.set_timings(config.timings);
        self.sync.set_enabled(config.clipboard_sync_enabled);
        logging::set_debug(config.enable_debug_logging);
        if let Ok(mut current) = self.config.lock() {
            *current = config.clone();
        }
    }
}

#[derive(Clone, serde::Serialize)]
struct RegistrationFailed {
    hotkey: String,
    message: String,
}

fn read_config(app: &AppHandle) -> anyhow::Result<Option<AppConfig>> {
    let store = app.store(STORE_FILE)?;
    match store.get(CONFIG_KEY) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

fn write_config(app: &AppHandle, config: &AppConfig) -> anyhow::Result<()> {
    let store = app.store(STORE_FILE)?;
    store.set(CONFIG_KEY.to_string(), serde_json::to_value(config)?);
    store.save()?;
    Ok(())
}

fn report_registration_failure(app: &AppHandle, hotkey: &str, err: Error) {
    error!("Failed to register hotkey {}: {}", hotkey, err);
    let payload = RegistrationFailed {
        hotkey: hotkey.to_string(),
        message: err.to_string(),
    };
    if let Err(e) = app.emit("hotkey-registration-failed", payload) {
        warn!("Failed to notify UI of hotkey failure: {}", e);
    }
}

// Tauri commands

#[tauri::command]
async fn load_config(app: AppHandle) -> Result<AppConfig, String> {
    match read_config(&app).map_err(|e| e.to_string())? {
        Some(config) => Ok(config),
        None => {
            let default_config = AppConfig::default();
            write_config(&app, &default_config).map_err(|e| e.to_string())?;
            Ok(default_config)
        }
    }
}

#[tauri::command]
async fn save_config(
    app: AppHandle,
    state: State<'_, AppState>,
    mut config: AppConfig,
) -> Result<(), String> {
    let spec = HotkeySpec::parse(&config.hotkey).map_err(|e| e.to_string())?;
    let requested = spec.canonical();

    let registered = if state.registrar.needs_update(&spec) {
        state.registrar.switch_to(&spec)
    } else {
        Ok(())
    };

    // Persist the hotkey that is actually live, so a refused one is not
    // what the next launch tries.
    config.hotkey = match &registered {
        Ok(()) => requested.clone(),
        Err(_) => state
            .registrar
            .active()
            .map(|active| active.canonical())
            .unwrap_or_else(|| state.config().hotkey),
    };
    write_config(&app, &config).map_err(|e| e.to_string())?;
    state.apply(&config);

    if let Err(e) = registered {
        let err = Error::from(e);
        report_registration_failure(&app, &requested, err.clone());
        return Err(err.to_string());
    }
    Ok(())
}

#[tauri::command]
async fn get_captured_text(slot: State<'_, CaptureSlot>) -> Result<String, String> {
    Ok(slot.take_text())
}

async fn run_capture(app: &AppHandle) -> Result<CaptureResult, String> {
    let slot = app.state::<CaptureSlot>();
    slot.clear();

    let handle = app.clone();
    let result = tauri::async_runtime::spawn_blocking(move || {
        let state = handle.state::<AppState>();
        state.capture.capture(&state.desktop)
    })
    .await
    .map_err(|e| e.to_string())?;

    slot.store(result.clone());

    if let Err(e) = app.emit("selection-captured", result.text.clone()) {
        warn!("Failed to emit captured selection: {}", e);
    }
    Ok(result)
}

#[tauri::command]
async fn capture_now(app: AppHandle) -> Result<CaptureResult, String> {
    run_capture(&app).await
}

#[tauri::command]
async fn deliver_result(app: AppHandle, text: String) -> Result<Delivery, String> {
    let target = app.state::<CaptureSlot>().take_target();

    // The popup must be gone before keys are synthesized into the target.
    hide_popup_window(app.clone()).await?;

    let handle = app.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let state = handle.state::<AppState>();
        let config = state.config();
        inject::deliver(&state.desktop, &text, target, config.paste_behavior, &config.timings)
    })
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
async fn peek_clipboard(
    app: AppHandle,
    current_text: String,
    only_if_empty: bool,
) -> Result<Option<String>, String> {
    tauri::async_runtime::spawn_blocking(move || {
        let state = app.state::<AppState>();
        state.sync.peek(&state.desktop, &current_text, only_if_empty)
    })
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
async fn force_peek_clipboard(
    app: AppHandle,
    current_text: String,
    only_if_empty: bool,
) -> Result<Option<String>, String> {
    tauri::async_runtime::spawn_blocking(move || {
        let state = app.state::<AppState>();
        state.sync.force_peek(&state.desktop, &current_text, only_if_empty)
    })
    .await
    .map_err(|e| e.to_string())
}

#[tauri::command]
async fn begin_hotkey_capture(state: State<'_, AppState>) -> Result<bool, String> {
    Ok(state.assistant.begin())
}

#[tauri::command]
async fn record_hotkey_key(
    state: State<'_, AppState>,
    input: KeyInput,
) -> Result<CaptureOutcome, String> {
    let current = state.registrar.active();
    Ok(state.assistant.record(&input, current.as_ref()))
}

#[tauri::command]
async fn cancel_hotkey_capture(state: State<'_, AppState>) -> Result<(), String> {
    state.assistant.cancel();
    Ok(())
}

#[tauri::command]
async fn show_popup_window(app: AppHandle) -> Result<(), String> {
    if let Some(window) = app.get_webview_window("popup") {
        window.show().map_err(|e| e.to_string())?;
        window.set_focus().map_err(|e| e.to_string())?;
    } else {
        let width = app.state::<AppState>().config().popup_width;
        let popup = tauri::WebviewWindowBuilder::new(
            &app,
            "popup",
            tauri::WebviewUrl::App("popup.html".into()),
        )
        .title("Ask Selection")
        .inner_size(width, 600.0)
        .resizable(true)
        .decorations(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .theme(None)
        .build()
        .map_err(|e| e.to_string())?;

        popup.show().map_err(|e| e.to_string())?;
        popup.set_focus().map_err(|e| e.to_string())?;

        // Close popup window when it loses focus
        let popup_clone = popup.clone();
        popup.on_window_event(move |event| {
            if let WindowEvent::Focused(false) = event {
                let _ = popup_clone.close();
            }
        });
    }

    Ok(())
}

#[tauri::command]
async fn hide_popup_window(app: AppHandle) -> Result<(), String> {
    if let Some(window) = app.get_webview_window("popup") {
        window.hide().map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn on_hotkey(app: AppHandle) {
    tauri::async_runtime::spawn(async move {
        if let Err(e) = run_capture(&app).await {
            warn!("Selection capture task failed: {}", e);
        }
        if let Err(e) = show_popup_window(app).await {
            warn!("Failed to show popup: {}", e);
        }
    });
}

fn show_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn build_desktop() -> Desktop {
    #[cfg(windows)]
    let (focus, accessibility) = (
        Arc::new(crate::platform::ForegroundFocus::new()) as Arc<dyn crate::platform::WindowFocus>,
        Arc::new(crate::platform::UiAutomation::new())
            as Arc<dyn crate::platform::AccessibilityProvider>,
    );
    #[cfg(not(windows))]
    let (focus, accessibility) = (
        Arc::new(crate::platform::PassiveFocus) as Arc<dyn crate::platform::WindowFocus>,
        Arc::new(crate::platform::NoAccessibility)
            as Arc<dyn crate::platform::AccessibilityProvider>,
    );

    Desktop::new(
        Arc::new(SystemClipboard::new()),
        Arc::new(EnigoKeyboard::new()),
        focus,
        accessibility,
    )
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        // A second launch would fight this one for the hotkey.
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            info!("Second instance started, focusing the running one");
            show_main_window(app);
        }))
        .plugin(tauri_plugin_opener::init())
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, shortcut, event| {
                    if event.state != ShortcutState::Pressed {
                        return;
                    }
                    let Some(state) = app.try_state::<AppState>() else {
                        return;
                    };
                    let ours = state
                        .hotkeys
                        .resolve(shortcut)
                        .is_some_and(|id| state.registrar.dispatch(id));
                    if ours {
                        debug!("Hotkey fired");
                        on_hotkey(app.clone());
                    }
                })
                .build(),
        )
        .plugin(tauri_plugin_store::Builder::default().build())
        .setup(|app| {
            let handle = app.handle().clone();

            // The logger needs the debug flag, so a read error waits for it.
            let (config, read_error) = match read_config(&handle) {
                Ok(config) => (config.unwrap_or_default(), None),
                Err(e) => (AppConfig::default(), Some(e)),
            };

            let log_dir = app.path().app_log_dir().ok();
            logging::init(log_dir.as_deref(), config.enable_debug_logging);
            info!("Starting Ask Selection {}", env!("CARGO_PKG_VERSION"));
            if let Some(e) = read_error {
                warn!("Failed to read config, using defaults: {:#}", e);
            }

            let hotkeys = Arc::new(GlobalShortcutBackend::new(handle.clone()));
            let state = AppState {
                desktop: Arc::new(build_desktop()),
                capture: SelectionCapture::new(config.timings),
                sync: ClipboardSync::new(config.clipboard_sync_enabled),
                registrar: Registrar::new(hotkeys.clone()),
                assistant: CaptureAssistant::new(hotkeys.clone()),
                hotkeys,
                config: Mutex::new(config.clone()),
            };
            state.apply(&config);
            app.manage(state);
            app.manage(CaptureSlot::new());

            // Setup system tray
            let show = MenuItem::with_id(app, "show", "Show Settings", true, None::<&str>)?;
            let quit = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
            let menu = Menu::with_items(app, &[&show, &quit])?;

            let icon = app
                .default_window_icon()
                .cloned()
                .context("no default window icon")?;
            let _tray = TrayIconBuilder::new()
                .icon(icon)
                .menu(&menu)
                .on_menu_event(|app, event| match event.id.as_ref() {
                    "show" => show_main_window(app),
                    "quit" => {
                        app.exit(0);
                    }
                    _ => {}
                })
                .on_tray_icon_event(|tray, event| {
                    if let TrayIconEvent::Click { .. } = event {
                        show_main_window(tray.app_handle());
                    }
                })
                .build(app)?;

            // Handle window close event - minimize to tray instead of closing
            if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
                let window_clone = window.clone();
                window.on_window_event(move |event| {
                    if let WindowEvent::CloseRequested { api, .. } = event {
                        api.prevent_close();
                        let _ = window_clone.hide();
                    }
                });
            }

            // A missing trigger is reported, never fatal.
            let state = app.state::<AppState>();
            let registered = HotkeySpec::parse(&config.hotkey)
                .map_err(Into::into)
                .and_then(|spec| state.registrar.register(&spec));
            if let Err(e) = registered {
                report_registration_failure(&handle, &config.hotkey, e.into());
            }

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            load_config,
            save_config,
            get_captured_text,
            capture_now,
            deliver_result,
            peek_clipboard,
            force_peek_clipboard,
            begin_hotkey_capture,
            record_hotkey_key,
            cancel_hotkey_capture,
            show_popup_window,
            hide_popup_window,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_window_is_declared() {
        let conf: serde_json::Value =
            serde_json::from_str(include_str!("../tauri.conf.json")).unwrap();
        let labels: Vec<&str> = conf["app"]["windows"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|w| w["label"].as_str())
            .collect();
        assert!(labels.contains(&MAIN_WINDOW));
    }
}
