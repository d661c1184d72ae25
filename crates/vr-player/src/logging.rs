//! env_logger setup.
//!
//! `RUST_LOG` works as usual with `info` as the default. Two extra variables:
//! `VR_PLAYER_LOG_LEVELS` takes `module:level` pairs separated by commas and
//! overrides `RUST_LOG`, and `VR_PLAYER_LOG_FILE` appends records to a file
//! instead of stderr.

use std::fs::OpenOptions;
use std::path::Path;

use env_logger::{Builder, Env, Target};

pub const LEVELS_VAR: &str = "VR_PLAYER_LOG_LEVELS";
pub const FILE_VAR: &str = "VR_PLAYER_LOG_FILE";

/// Translate `vr_player::orientation:debug,tungstenite:warn` into env_logger
/// filter syntax. Entries without a level (or a bare level) pass through.
pub fn translate_levels(levels: &str) -> String {
    levels
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.rsplit_once(':') {
            Some((module, level)) if !module.is_empty() && !module.ends_with(':') => {
                format!("{}={}", module.trim(), level.trim())
            }
            _ => entry.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global logger. Call once, before anything logs.
pub fn init() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();

    if let Ok(levels) = std::env::var(LEVELS_VAR) {
        builder.parse_filters(&translate_levels(&levels));
    }

    let mut file_error = None;
    if let Ok(file) = std::env::var(FILE_VAR) {
        let path = Path::new(&file);
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => {
                builder.target(Target::Pipe(Box::new(f)));
            }
            Err(e) => file_error = Some(format!("{}: {e}", path.display())),
        }
    }

    builder.init();
    if let Some(e) = file_error {
        log::warn!("Cannot open log file {e}, logging to stderr");
    }
}
