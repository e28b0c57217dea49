//! Relational side of long-term memory

use vayuu_storage::UserDataStorage;

use crate::error::{AiError, Result};

/// Structured user facts kept alongside the vector index.
pub trait ProfileStore: Send + Sync {
    fn upsert_profile(&self, key: &str, value: &str) -> Result<()>;

    fn upsert_preference(&self, key: &str, value: &str, category: &str, increment: f64)
    -> Result<()>;

    /// Returns the mention count after incrementing.
    fn increment_topic(&self, name: &str) -> Result<u64>;

    fn user_summary(&self) -> Result<String>;
}

fn storage_error(error: anyhow::Error) -> AiError {
    AiError::Storage(format!("{error:#}"))
}

impl ProfileStore for UserDataStorage {
    fn upsert_profile(&self, key: &str, value: &str) -> Result<()> {
        UserDataStorage::upsert_profile(self, key, value).map_err(storage_error)
    }

    fn upsert_preference(
        &self,
        key: &str,
        value: &str,
        category: &str,
        increment: f64,
    ) -> Result<()> {
        UserDataStorage::upsert_preference(self, key, value, category, increment)
            .map(|_| ())
            .map_err(storage_error)
    }

    fn increment_topic(&self, name: &str) -> Result<u64> {
        UserDataStorage::increment_topic(self, name).map_err(storage_error)
    }

    fn user_summary(&self) -> Result<String> {
        UserDataStorage::user_summary(self).map_err(storage_error)
    }
}
