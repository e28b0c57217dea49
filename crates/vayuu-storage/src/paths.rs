//! Path utilities for Vayuu directory resolution.

use anyhow::Result;
use std::path::{Path, PathBuf};

const VAYUU_DIR: &str = ".vayuu";
const DATABASE_FILE: &str = "memory.redb";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable to override the Vayuu directory.
const VAYUU_DIR_ENV: &str = "VAYUU_DIR";

/// Resolve the Vayuu data directory.
/// Priority: VAYUU_DIR env var > ~/.vayuu/
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(VAYUU_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(VAYUU_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the Vayuu directory exists and return its path.
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = resolve_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default relational store location: ~/.vayuu/memory.redb
pub fn default_database_path() -> Result<PathBuf> {
    Ok(resolve_data_dir()?.join(DATABASE_FILE))
}

/// Default config location: ~/.vayuu/config.toml
pub fn default_config_path() -> Result<PathBuf> {
    Ok(resolve_data_dir()?.join(CONFIG_FILE))
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    Path::new(path).to_path_buf()
}
