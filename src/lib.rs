pub mod capture;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod hotkey;
pub mod inject;
pub mod logging;
pub mod platform;
pub mod text;

#[cfg(feature = "desktop")]
mod app;
#[cfg(test)]
mod testing;

#[cfg(feature = "desktop")]
pub use app::run;
