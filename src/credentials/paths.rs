// Filesystem locations for subfeed.
// Resolves cache and config directories through the platform project dirs.

use std::path::PathBuf;

use directories::ProjectDirs;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "subfeed")
}

/// Get the base cache directory (~/.cache/subfeed on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the config directory (~/.config/subfeed on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path to the persisted credential cache.
pub fn credentials_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("credentials.json"))
}

/// Path to the log file used while the TUI owns the terminal.
pub fn log_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("subfeed.log"))
}

/// Path to the default config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
