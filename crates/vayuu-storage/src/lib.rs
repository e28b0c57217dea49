//! Vayuu Storage - relational side of long-term memory
//!
//! Uses redb as the embedded database. Values are JSON-encoded records keyed
//! by their natural key, so every write is an upsert inside a single write
//! transaction.
//!
//! # Tables
//!
//! - `user_profile` - Facts about the user (`name`, `city`, ...)
//! - `preferences` - Preferences with a reinforcement confidence
//! - `topics` - Topic mention counters

pub mod paths;
pub mod time_utils;
pub mod user_data;

use anyhow::{Context, Result};
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use user_data::{Preference, ProfileEntry, Topic, UserDataStorage};

/// Open (or create) the database file, creating parent directories as needed.
pub fn open_database(path: impl AsRef<Path>) -> Result<Arc<Database>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = Database::create(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Opened database");
    Ok(Arc::new(db))
}
