use log::{warn, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, File};
use std::path::Path;

pub const LOG_FILE: &str = "ask-selection.log";

pub fn level_for(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Terminal logger plus, when `log_dir` is writable, a log file inside it.
///
/// Loggers are installed at `Debug`; the effective level is the global max
/// level, so [`set_debug`] can change it at runtime. Calling this twice is
/// harmless.
pub fn init(log_dir: Option<&Path>, debug: bool) {
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("tao")
        .add_filter_ignore_str("wry")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Debug,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    let mut file_error = None;
    if let Some(dir) = log_dir {
        match fs::create_dir_all(dir).and_then(|_| File::create(dir.join(LOG_FILE))) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config, file)),
            Err(e) => file_error = Some((dir.display().to_string(), e)),
        }
    }

    if CombinedLogger::init(loggers).is_ok() {
        set_debug(debug);
    }
    // Terminal only from here on.
    if let Some((dir, e)) = file_error {
        warn!("Failed to open log file in {}: {}", dir, e);
    }
}

pub fn set_debug(debug: bool) {
    log::set_max_level(level_for(debug));
}
