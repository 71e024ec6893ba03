//! XDG Base Directory utilities for configuration and local state.

use crate::error::RecallError;
use std::path::PathBuf;

const APP_DIR: &str = "recall";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise defaults to `$HOME/.local/share`
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, RecallError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        RecallError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/recall/`
pub fn config_dir() -> Result<PathBuf, RecallError> {
    Ok(config_home()?.join(APP_DIR))
}

/// Base name of the global config file; the extension picks the format.
pub fn global_config_stem() -> Result<PathBuf, RecallError> {
    Ok(config_dir()?.join("config"))
}

/// `$XDG_DATA_HOME/recall/state/`, the sled database directory.
///
/// Not created here; the store creates it on open.
pub fn state_db_dir() -> Result<PathBuf, RecallError> {
    let data_home = data_home().ok_or_else(|| {
        RecallError::ConfigError(
            "Could not determine XDG data home directory (HOME not set)".to_string(),
        )
    })?;
    Ok(data_home.join(APP_DIR).join("state"))
}
