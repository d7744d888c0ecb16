fn main() {
    // The headless core (`--no-default-features`) has no Tauri context to build.
    if std::env::var_os("CARGO_FEATURE_DESKTOP").is_some() {
        tauri_build::build()
    }
}
