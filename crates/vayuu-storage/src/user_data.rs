//! User profile, preference and topic storage.
//!
//! The relational half of long-term memory. Writes to the same key replace
//! the previous record; preferences additionally accumulate confidence.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::time_utils::now_ms;

const PROFILE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("user_profile");
const PREFERENCE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("preferences");
const TOPIC_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("topics");

/// Confidence assigned to a preference the first time it is seen.
pub const INITIAL_CONFIDENCE: f64 = 1.0;
/// Upper bound for preference confidence.
pub const MAX_CONFIDENCE: f64 = 1.0;
/// Preferences below this confidence are left out of the user summary.
const SUMMARY_MIN_CONFIDENCE: f64 = 0.5;
/// Number of topics listed in the user summary.
pub const SUMMARY_TOPIC_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub key: String,
    pub value: String,
    pub category: String,
    pub confidence: f64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub mentions: u64,
    pub last_mentioned: i64,
}

/// redb-backed store for profile facts, preferences and topic counters
#[derive(Clone)]
pub struct UserDataStorage {
    db: Arc<Database>,
}

impl UserDataStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PROFILE_TABLE)?;
        write_txn.open_table(PREFERENCE_TABLE)?;
        write_txn.open_table(TOPIC_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    // ============== Profile ==============

    pub fn upsert_profile(&self, key: &str, value: &str) -> Result<()> {
        let entry = ProfileEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now_ms(),
        };
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROFILE_TABLE)?;
            let serialized = serde_json::to_vec(&entry)?;
            table.insert(key, serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_profile(&self, key: &str) -> Result<Option<ProfileEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILE_TABLE)?;

        if let Some(data) = table.get(key)? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }

    /// All profile entries, ordered by key.
    pub fn list_profile(&self) -> Result<Vec<ProfileEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILE_TABLE)?;

        let mut entries = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    // ============== Preferences ==============

    /// Insert a preference or reinforce an existing one.
    ///
    /// A first insert stores [`INITIAL_CONFIDENCE`]. A repeat replaces value
    /// and category and raises confidence by `increment`, capped at
    /// [`MAX_CONFIDENCE`]. The read and the write share one transaction.
    pub fn upsert_preference(
        &self,
        key: &str,
        value: &str,
        category: &str,
        increment: f64,
    ) -> Result<Preference> {
        let write_txn = self.db.begin_write()?;
        let preference = {
            let mut table = write_txn.open_table(PREFERENCE_TABLE)?;
            let existing: Option<Preference> = match table.get(key)? {
                Some(data) => Some(serde_json::from_slice(data.value())?),
                None => None,
            };

            let confidence = match existing {
                Some(previous) => (previous.confidence + increment).min(MAX_CONFIDENCE),
                None => INITIAL_CONFIDENCE,
            };
            let preference = Preference {
                key: key.to_string(),
                value: value.to_string(),
                category: category.to_string(),
                confidence,
                updated_at: now_ms(),
            };
            let serialized = serde_json::to_vec(&preference)?;
            table.insert(key, serialized.as_slice())?;
            preference
        };
        write_txn.commit()?;
        Ok(preference)
    }

    pub fn get_preference(&self, key: &str) -> Result<Option<Preference>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PREFERENCE_TABLE)?;

        if let Some(data) = table.get(key)? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }

    /// All preferences, highest confidence first.
    pub fn list_preferences(&self) -> Result<Vec<Preference>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PREFERENCE_TABLE)?;

        let mut preferences: Vec<Preference> = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            preferences.push(serde_json::from_slice(value.value())?);
        }
        preferences.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(preferences)
    }

    // ============== Topics ==============

    /// Bump the mention counter for `name`, returning the new count.
    pub fn increment_topic(&self, name: &str) -> Result<u64> {
        let write_txn = self.db.begin_write()?;
        let mentions = {
            let mut table = write_txn.open_table(TOPIC_TABLE)?;
            let previous: Option<Topic> = match table.get(name)? {
                Some(data) => Some(serde_json::from_slice(data.value())?),
                None => None,
            };
            let topic = Topic {
                name: name.to_string(),
                mentions: previous.map(|t| t.mentions).unwrap_or(0) + 1,
                last_mentioned: now_ms(),
            };
            let serialized = serde_json::to_vec(&topic)?;
            table.insert(name, serialized.as_slice())?;
            topic.mentions
        };
        write_txn.commit()?;
        Ok(mentions)
    }

    /// Most mentioned topics first; ties go to the most recent mention.
    pub fn top_topics(&self, limit: usize) -> Result<Vec<Topic>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOPIC_TABLE)?;

        let mut topics: Vec<Topic> = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            topics.push(serde_json::from_slice(value.value())?);
        }
        topics.sort_by(|a, b| {
            b.mentions
                .cmp(&a.mentions)
                .then(b.last_mentioned.cmp(&a.last_mentioned))
        });
        topics.truncate(limit);
        Ok(topics)
    }

    /// Human-readable digest of everything known about the user.
    ///
    /// Returns an empty string when nothing has been stored yet.
    pub fn user_summary(&self) -> Result<String> {
        let profile = self.list_profile()?;
        let preferences: Vec<Preference> = self
            .list_preferences()?
            .into_iter()
            .filter(|p| p.confidence >= SUMMARY_MIN_CONFIDENCE)
            .collect();
        let topics = self.top_topics(SUMMARY_TOPIC_LIMIT)?;

        let mut summary = String::new();
        if !profile.is_empty() {
            summary.push_str("User profile:\n");
            for entry in &profile {
                let _ = writeln!(summary, "- {}: {}", entry.key, entry.value);
            }
        }
        if !preferences.is_empty() {
            if !summary.is_empty() {
                summary.push('\n');
            }
            summary.push_str("Known preferences:\n");
            for pref in &preferences {
                let _ = writeln!(
                    summary,
                    "- {} ({}): {} ({:.0}%)",
                    pref.key,
                    pref.category,
                    pref.value,
                    pref.confidence * 100.0
                );
            }
        }
        if !topics.is_empty() {
            if !summary.is_empty() {
                summary.push('\n');
            }
            summary.push_str("Recent topics:\n");
            for topic in &topics {
                let _ = writeln!(summary, "- {} ({})", topic.name, topic.mentions);
            }
        }
        Ok(summary.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_storage() -> (UserDataStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = UserDataStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_profile_upsert_replaces_value() {
        let (storage, _temp_dir) = setup_test_storage();

        storage.upsert_profile("name", "Alex").unwrap();
        storage.upsert_profile("city", "Pune").unwrap();
        storage.upsert_profile("name", "Alexandra").unwrap();

        let name = storage.get_profile("name").unwrap().unwrap();
        assert_eq!(name.value, "Alexandra");

        let all = storage.list_profile().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, "city");
        assert!(storage.get_profile("missing").unwrap().is_none());
    }

    #[test]
    fn test_preference_first_insert_is_full_confidence() {
        let (storage, _temp_dir) = setup_test_storage();

        let pref = storage
            .upsert_preference("hiking", "hiking", "hobby", 0.1)
            .unwrap();
        assert_eq!(pref.confidence, 1.0);
        assert_eq!(pref.category, "hobby");
    }

    #[test]
    fn test_preference_repeat_is_capped_and_not_duplicated() {
        let (storage, _temp_dir) = setup_test_storage();

        for _ in 0..5 {
            storage
                .upsert_preference("hiking", "hiking", "hobby", 0.1)
                .unwrap();
        }
        let pref = storage
            .upsert_preference("hiking", "mountain hiking", "hobby", 0.1)
            .unwrap();

        assert_eq!(pref.confidence, MAX_CONFIDENCE);
        assert_eq!(pref.value, "mountain hiking");
        assert_eq!(storage.list_preferences().unwrap().len(), 1);
    }

    #[test]
    fn test_topic_counter_and_ordering() {
        let (storage, _temp_dir) = setup_test_storage();

        assert_eq!(storage.increment_topic("rust").unwrap(), 1);
        assert_eq!(storage.increment_topic("rust").unwrap(), 2);
        storage.increment_topic("cooking").unwrap();
        storage.increment_topic("rust").unwrap();

        let top = storage.top_topics(5).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "rust");
        assert_eq!(top[0].mentions, 3);

        let only_one = storage.top_topics(1).unwrap();
        assert_eq!(only_one.len(), 1);
    }

    #[test]
    fn test_user_summary_empty_store() {
        let (storage, _temp_dir) = setup_test_storage();
        assert_eq!(storage.user_summary().unwrap(), "");
    }

    #[test]
    fn test_user_summary_sections() {
        let (storage, _temp_dir) = setup_test_storage();

        storage.upsert_profile("name", "Alex").unwrap();
        storage
            .upsert_preference("coffee", "black coffee", "food", 0.1)
            .unwrap();
        storage.increment_topic("hiking").unwrap();

        let summary = storage.user_summary().unwrap();
        assert!(summary.contains("User profile:\n- name: Alex"));
        assert!(summary.contains("- coffee (food): black coffee (100%)"));
        assert!(summary.contains("Recent topics:\n- hiking (1)"));
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("reopen.db");
        {
            let db = Arc::new(Database::create(&db_path).unwrap());
            let storage = UserDataStorage::new(db).unwrap();
            storage.upsert_profile("name", "Alex").unwrap();
        }

        let db = Arc::new(Database::create(&db_path).unwrap());
        let storage = UserDataStorage::new(db).unwrap();
        assert_eq!(storage.get_profile("name").unwrap().unwrap().value, "Alex");
    }
}
