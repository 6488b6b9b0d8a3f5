//! Configuration loading and root folder resolution
//!
//! The root folder holds everything showrate persists locally: the SQLite
//! database and the guest identity file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default per-call timeout for store round trips, in milliseconds.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Optional TOML configuration file contents.
///
/// All fields are optional; missing values fall through to the next step of
/// the resolution chain or to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub store_timeout_ms: Option<u64>,
}

impl TomlConfig {
    /// Load the config file if one exists; missing file is not an error.
    pub fn load() -> Result<Option<TomlConfig>> {
        let path = match config_file_path() {
            Ok(p) => p,
            Err(_) => return Ok(None),
        };
        let content = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(Some(config))
    }
}

/// Root folder resolution priority order:
/// 1. Explicit argument from the embedding application (highest priority)
/// 2. `SHOWRATE_ROOT` environment variable
/// 3. TOML config file `root_folder` key
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(explicit: Option<&Path>) -> PathBuf {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var("SHOWRATE_ROOT") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(Some(config)) = TomlConfig::load() {
        if let Some(root) = config.root_folder {
            return root;
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path of the SQLite database inside the root folder.
pub fn database_path(root: &Path) -> PathBuf {
    root.join("showrate.db")
}

/// Path of the persisted guest identity file inside the root folder.
pub fn guest_id_path(root: &Path) -> PathBuf {
    root.join("guest_id")
}

/// Get default configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .map(|d| d.join("showrate").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/showrate
        dirs::data_local_dir()
            .map(|d| d.join("showrate"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/showrate"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/showrate
        dirs::data_dir()
            .map(|d| d.join("showrate"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/showrate"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\showrate
        dirs::data_local_dir()
            .map(|d| d.join("showrate"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\showrate"))
    } else {
        PathBuf::from("./showrate_data")
    }
}
