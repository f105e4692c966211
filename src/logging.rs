//! Logging configuration for xorriso-burner
//!
//! Logs go to the terminal and to a file at:
//! `$XDG_DATA_HOME/xorriso-burner/logs/xorriso-burner.log`
//! (`~/.local/share/...` on Linux).
//!
//! The file keeps the full xorriso conversation at debug level, which is
//! what to attach to a bug report about a failed burn.

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const LOG_FILE_NAME: &str = "xorriso-burner.log";

/// Rotate once the file grows past this many bytes
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

pub fn get_log_directory() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("xorriso-burner").join("logs"))
}

pub fn get_log_file_path() -> Option<PathBuf> {
    get_log_directory().map(|d| d.join(LOG_FILE_NAME))
}

/// Initialize the logging system
///
/// Terminal output shows info and above; the file captures debug.
/// Returns the log file path when file logging is active.
pub fn init_logging() -> Option<PathBuf> {
    let Some(log_dir) = get_log_directory() else {
        eprintln!("Warning: Could not determine log directory");
        init_terminal_only();
        return None;
    };

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        init_terminal_only();
        return None;
    }

    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_if_large(&log_path, MAX_LOG_SIZE);

    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_terminal_only();
            return None;
        }
    };

    let config = log_config();
    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(LevelFilter::Info, config.clone(), TerminalMode::Stderr, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, config, log_file),
    ];

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("Warning: Logger already initialized");
    }

    log::info!("=== xorriso-burner session started ===");
    log::info!("Log file: {}", log_path.display());

    Some(log_path)
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build()
}

/// Fallback when the log file cannot be used
fn init_terminal_only() {
    let term_logger =
        TermLogger::new(LevelFilter::Info, log_config(), TerminalMode::Stderr, ColorChoice::Auto);
    let _ = CombinedLogger::init(vec![term_logger]);
}

/// Move `path` to `<path>.old` once it exceeds `limit` bytes
fn rotate_if_large(path: &Path, limit: u64) {
    if let Ok(metadata) = fs::metadata(path)
        && metadata.len() > limit
    {
        let mut backup = path.as_os_str().to_owned();
        backup.push(".old");
        let _ = fs::rename(path, PathBuf::from(backup));
    }
}
