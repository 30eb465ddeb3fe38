//! Path constants for configuration and record files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "rollscreen";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the high score record file (prefixed with . for hidden)
pub const RECORD_FILE_NAME: &str = ".record.json";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "rollscreen.log";

/// Get the configuration directory path (~/.config/rollscreen/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/rollscreen/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the high score record path (`~/.config/rollscreen/.record.json`)
#[must_use]
pub fn record_path() -> PathBuf {
    config_dir().join(RECORD_FILE_NAME)
}

/// Get the log file path (`~/.config/rollscreen/rollscreen.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
