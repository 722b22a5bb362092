/// Footprint - lay out mesh cross-sections on a printable sheet
///
/// Usage: footprint [MODEL...]
///
/// Models given on the command line are loaded as one batch at start-up.
/// Controls:
///   - a: Add models, c: Clear, e: Export
///   - Tab: Cycle selection, Arrows: Nudge 1mm (Shift: 10mm)
///   - Mouse: Drag items
///   - Q/ESC: Quit
///
/// Logs go to `footprint.log` in the temp directory, or to
/// `FOOTPRINT_LOG_FILE`. `FOOTPRINT_CONFIG` names a JSON layout config.
use anyhow::{Context, Result};
use crossterm::terminal;
use footprint_core::{LayoutConfig, Session};
use footprint_terminal::TerminalApp;
use std::fs::File;
use std::path::PathBuf;

fn init_logging() -> Result<PathBuf> {
    let path = std::env::var_os("FOOTPRINT_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("footprint.log"));
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    // The terminal is in raw mode while the app runs, so logs go to a file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    Ok(path)
}

fn load_config() -> Result<LayoutConfig> {
    match std::env::var_os("FOOTPRINT_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = LayoutConfig::load(&path)
                .with_context(|| format!("invalid config {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(LayoutConfig::default()),
    }
}

fn main() -> Result<()> {
    let log_path = init_logging()?;
    log::info!("Starting footprint v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let models: Vec<String> = std::env::args().skip(1).collect();

    let (width, height) = terminal::size().context("failed to query terminal size")?;
    let mut app = TerminalApp::new(Session::new(config), width, height);
    if !models.is_empty() {
        app.add_models(&models);
    }

    app.run().context("terminal session failed")?;

    println!("Log written to {}", log_path.display());
    Ok(())
}
