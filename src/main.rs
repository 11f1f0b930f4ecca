// Entry point for the Mineframe terminal panel
// Loads configuration, starts file logging and launches the panel UI

use std::error::Error;
use std::fs::{self, File};
use std::sync::Mutex;

// Module declarations
mod mf_color; // Terminal color-depth matching and panel palette
mod mf_error; // Error types
mod mf_frame; // Host SDK glue and the local stand-in host
mod mf_game;  // Board engine, game session and configuration
mod mf_lang;  // Multi-language string resources
mod mf_ui;    // Terminal UI rendering and event handling

use mf_game::{load_or_create_config, log_path, Config};
use mf_lang::Lang;
use mf_ui::run as run_ui;

/// Route tracing output to a file; the alternate screen owns stdout
fn init_logging(cfg: &Config) {
    let Some(path) = log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = File::create(&path) else {
        return;
    };
    tracing_subscriber::fmt()
        .with_max_level(cfg.tracing_level())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let (mut cfg, load_warning) = load_or_create_config();
    init_logging(&cfg);
    if let Some(warning) = load_warning {
        tracing::warn!("{}", warning);
    }

    // Fail fast on boards the generator cannot fill
    if let Err(e) = cfg.validate() {
        tracing::error!(error = %e, "invalid board configuration");
        return Err(e.into());
    }
    tracing::info!(size = cfg.size, mines = cfg.mine_count, placement = ?cfg.placement, "starting panel");

    let lang = Lang::new(&cfg.language);
    run_ui(&mut cfg, &lang)
}
