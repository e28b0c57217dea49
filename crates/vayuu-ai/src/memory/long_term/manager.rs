//! Long-term memory manager
//!
//! Combines the embedder, the vector index and the relational profile store.
//! Free text is embedded and searched by cosine similarity; facts extracted
//! from finished turns are written to both halves.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::extractor::{ExtractedKind, FactExtractor};
use super::profile::ProfileStore;
use super::types::{MemoryRecord, MemoryType, ScoredRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{AiError, Result};
use crate::llm::LlmClient;
use crate::vector::VectorIndex;

/// Number of hits considered when building prompt context
pub const CONTEXT_SEARCH_LIMIT: usize = 10;
/// Confidence added each time a preference is mentioned again
pub const PREFERENCE_INCREMENT: f64 = 0.1;
/// Rough bytes-per-token ratio for the context budget
const BYTES_PER_TOKEN: usize = 4;

const CLOSED: &str = "memory manager closed";

pub struct LongTermMemory {
    embedder: Arc<dyn EmbeddingProvider>,
    index: RwLock<Option<Arc<dyn VectorIndex>>>,
    profile: RwLock<Option<Arc<dyn ProfileStore>>>,
    extractor: FactExtractor,
    count: RwLock<usize>,
}

impl LongTermMemory {
    /// Wire the collaborators together and make sure the collection exists.
    pub async fn connect(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        profile: Arc<dyn ProfileStore>,
        extraction_llm: Arc<dyn LlmClient>,
    ) -> Result<Self> {
        index.ensure_collection().await?;
        info!(
            model = embedder.model_name(),
            dimension = embedder.dimension(),
            "Long-term memory initialized"
        );
        Ok(Self {
            embedder,
            index: RwLock::new(Some(index)),
            profile: RwLock::new(Some(profile)),
            extractor: FactExtractor::new(extraction_llm),
            count: RwLock::new(0),
        })
    }

    fn index(&self) -> Result<Arc<dyn VectorIndex>> {
        self.index
            .read()
            .clone()
            .ok_or_else(|| AiError::Memory(CLOSED.to_string()))
    }

    fn profile(&self) -> Result<Arc<dyn ProfileStore>> {
        self.profile
            .read()
            .clone()
            .ok_or_else(|| AiError::Memory(CLOSED.to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.index.read().is_none()
    }

    /// Embed `content` and store it. Returns the new record id.
    pub async fn add_memory(
        &self,
        content: &str,
        memory_type: MemoryType,
        metadata: BTreeMap<String, String>,
    ) -> Result<String> {
        let index = self.index()?;
        let started = Instant::now();

        let vector = self.embedder.embed(content).await?;
        let record = MemoryRecord::new(content, memory_type, metadata);
        index
            .upsert(&record.id, vector, record.to_payload())
            .await?;

        *self.count.write() += 1;
        debug!(
            id = %record.id,
            memory_type = %memory_type,
            duration_ms = started.elapsed().as_millis() as u64,
            "Memory added"
        );
        Ok(record.id)
    }

    pub async fn add_fact(&self, fact: &str, metadata: BTreeMap<String, String>) -> Result<String> {
        self.add_memory(fact, MemoryType::Fact, metadata).await
    }

    pub async fn add_preference(
        &self,
        preference: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String> {
        self.add_memory(preference, MemoryType::Preference, metadata)
            .await
    }

    pub async fn add_knowledge(
        &self,
        knowledge: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String> {
        self.add_memory(knowledge, MemoryType::Knowledge, metadata)
            .await
    }

    /// Top `limit` records by cosine similarity, best first.
    pub async fn search_memory(&self, query: &str, limit: usize) -> Result<Vec<ScoredRecord>> {
        let index = self.index()?;
        let started = Instant::now();

        let vector = self.embedder.embed(query).await?;
        let mut records: Vec<ScoredRecord> = index
            .search(&vector, limit)
            .await?
            .into_iter()
            .map(ScoredRecord::from)
            .collect();
        records.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            results = records.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Memory searched"
        );
        Ok(records)
    }

    /// Prompt block of the memories most relevant to `query`.
    ///
    /// Lines are added best match first while the block stays within
    /// `max_tokens * 4` bytes; a line that does not fit ends the block. An
    /// empty string means there is nothing to add.
    pub async fn get_context(&self, query: &str, max_tokens: usize) -> Result<String> {
        if self.is_closed() {
            return Ok(String::new());
        }
        let records = self.search_memory(query, CONTEXT_SEARCH_LIMIT).await?;
        Ok(format_context(&records, max_tokens * BYTES_PER_TOKEN))
    }

    /// Run extraction over a finished turn and store what comes back.
    ///
    /// Failures on individual items are logged and skipped.
    pub async fn process_conversation(
        &self,
        user_input: &str,
        assistant_response: &str,
    ) -> Result<()> {
        let profile = self.profile()?;
        let facts = self
            .extractor
            .extract(user_input, assistant_response)
            .await?;
        debug!(count = facts.len(), "Facts extracted");

        for fact in facts {
            let key = fact.key.trim();
            let value = fact.value.trim();
            if key.is_empty() || value.is_empty() {
                debug!(?fact, "Skipping extracted item with empty key or value");
                continue;
            }

            let mut metadata = BTreeMap::new();
            metadata.insert("source".to_string(), "conversation".to_string());

            match fact.kind {
                ExtractedKind::Fact => {
                    metadata.insert("key".to_string(), key.to_string());
                    if let Err(e) = self.add_fact(value, metadata).await {
                        warn!(error = %e, key, "Failed to store fact");
                    }
                    if let Err(e) = profile.upsert_profile(key, value) {
                        warn!(error = %e, key, "Failed to update profile");
                    }
                }
                ExtractedKind::Preference => {
                    let category = fact
                        .category
                        .as_deref()
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .unwrap_or("other");
                    metadata.insert("key".to_string(), key.to_string());
                    metadata.insert("category".to_string(), category.to_string());
                    if let Err(e) = self.add_preference(value, metadata).await {
                        warn!(error = %e, key, "Failed to store preference");
                    }
                    if let Err(e) =
                        profile.upsert_preference(key, value, category, PREFERENCE_INCREMENT)
                    {
                        warn!(error = %e, key, "Failed to update preference");
                    }
                }
                ExtractedKind::Topic => {
                    if let Err(e) = profile.increment_topic(value) {
                        warn!(error = %e, topic = value, "Failed to count topic");
                    }
                    metadata.insert("topic".to_string(), value.to_string());
                    if let Err(e) = self
                        .add_knowledge(&format!("Topic: {value}"), metadata)
                        .await
                    {
                        warn!(error = %e, topic = value, "Failed to store topic");
                    }
                }
                ExtractedKind::Unknown => {
                    debug!(key, "Ignoring extracted item of unknown type");
                }
            }
        }
        Ok(())
    }

    /// Number of records added through this manager.
    pub fn count(&self) -> usize {
        *self.count.read()
    }

    pub async fn delete_memory(&self, id: &str) -> Result<()> {
        let index = self.index()?;
        index.delete(id).await?;
        let mut count = self.count.write();
        *count = count.saturating_sub(1);
        Ok(())
    }

    /// Relational digest of the user; empty when nothing is known.
    pub fn user_summary(&self) -> Result<String> {
        self.profile()?.user_summary()
    }

    /// Release the index client and the profile store. Safe to call twice.
    pub async fn close(&self) -> Result<()> {
        let index = self.index.write().take();
        self.profile.write().take();
        if let Some(index) = index {
            index.close().await?;
            info!("Long-term memory closed");
        }
        Ok(())
    }
}

fn format_context(records: &[ScoredRecord], max_bytes: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut used = 0;
    for scored in records {
        let line = scored.record.context_line();
        let separator = usize::from(!lines.is_empty());
        if used + separator + line.len() > max_bytes {
            break;
        }
        used += separator + line.len();
        lines.push(line);
    }

    if lines.is_empty() {
        return String::new();
    }
    format!("Relevant memories:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionRequest, CompletionResponse};
    use crate::vector::InMemoryIndex;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Deterministic embedding: one bucket per first letter of each word.
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut vector = vec![0.0; 26];
            for word in text.split_whitespace() {
                if let Some(c) = word.chars().next().filter(char::is_ascii_alphabetic) {
                    vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
            }
            vector[0] += 0.01;
            Ok(vector)
        }

        fn dimension(&self) -> usize {
            26
        }

        fn model_name(&self) -> &str {
            "letters"
        }
    }

    struct ScriptedLlm(String);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider(&self) -> &str {
            "mock"
        }
        fn model(&self) -> &str {
            "mock"
        }
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse::text(self.0.clone()))
        }
    }

    #[derive(Default)]
    struct RecordingProfile {
        profile: Mutex<Vec<(String, String)>>,
        preferences: Mutex<Vec<(String, String, String)>>,
        topics: Mutex<Vec<String>>,
    }

    impl ProfileStore for RecordingProfile {
        fn upsert_profile(&self, key: &str, value: &str) -> Result<()> {
            self.profile.lock().push((key.into(), value.into()));
            Ok(())
        }
        fn upsert_preference(&self, key: &str, value: &str, category: &str, _: f64) -> Result<()> {
            self.preferences
                .lock()
                .push((key.into(), value.into(), category.into()));
            Ok(())
        }
        fn increment_topic(&self, name: &str) -> Result<u64> {
            let mut topics = self.topics.lock();
            topics.push(name.into());
            Ok(topics.len() as u64)
        }
        fn user_summary(&self) -> Result<String> {
            Ok(String::new())
        }
    }

    async fn manager_with(
        reply: &str,
    ) -> (LongTermMemory, Arc<InMemoryIndex>, Arc<RecordingProfile>) {
        let index = Arc::new(InMemoryIndex::new());
        let profile = Arc::new(RecordingProfile::default());
        let memory = LongTermMemory::connect(
            Arc::new(LetterEmbedder),
            index.clone(),
            profile.clone(),
            Arc::new(ScriptedLlm(reply.to_string())),
        )
        .await
        .unwrap();
        (memory, index, profile)
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let (memory, index, _) = manager_with("[]").await;
        memory
            .add_fact("zebras zigzag", BTreeMap::new())
            .await
            .unwrap();
        memory
            .add_knowledge("moon missions", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(memory.count(), 2);
        assert_eq!(index.len(), 2);

        let hits = memory.search_memory("zoo", 2).await.unwrap();
        assert_eq!(hits[0].record.content, "zebras zigzag");
        assert_eq!(hits[0].record.memory_type, MemoryType::Fact);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_context_respects_budget() {
        let (memory, _, _) = manager_with("[]").await;
        assert_eq!(memory.get_context("anything", 500).await.unwrap(), "");

        memory.add_fact("zebras zigzag", BTreeMap::new()).await.unwrap();
        memory.add_fact("zany zoo", BTreeMap::new()).await.unwrap();

        let context = memory.get_context("zebra", 500).await.unwrap();
        assert!(context.starts_with("Relevant memories:\n"));
        assert!(context.contains("[fact] zebras zigzag"));
        assert!(context.contains("[fact] zany zoo"));

        // 20 bytes leaves room for a single line
        let context = memory.get_context("zebra", 5).await.unwrap();
        assert_eq!(context.lines().count(), 2);

        // No line fits in 4 bytes
        assert_eq!(memory.get_context("zebra", 1).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_process_conversation_routes_items() {
        let reply = r#"```json
[
  {"type": "fact", "key": "name", "value": "Alex"},
  {"type": "preference", "key": "hiking", "value": "hiking", "category": "hobby"},
  {"type": "topic", "key": "outdoors", "value": "outdoors"},
  {"type": "fact", "key": "", "value": "nameless"}
]
```"#;
        let (memory, index, profile) = manager_with(reply).await;

        memory
            .process_conversation("My name is Alex and I like hiking.", "Nice to meet you!")
            .await
            .unwrap();

        assert_eq!(
            *profile.profile.lock(),
            vec![("name".to_string(), "Alex".to_string())]
        );
        assert_eq!(
            *profile.preferences.lock(),
            vec![(
                "hiking".to_string(),
                "hiking".to_string(),
                "hobby".to_string()
            )]
        );
        assert_eq!(*profile.topics.lock(), vec!["outdoors".to_string()]);
        assert_eq!(index.len(), 3);
        assert_eq!(memory.count(), 3);

        let hits = memory.search_memory("topic outdoors", 3).await.unwrap();
        let topic = hits
            .iter()
            .find(|h| h.record.memory_type == MemoryType::Knowledge)
            .unwrap();
        assert_eq!(topic.record.content, "Topic: outdoors");
        assert_eq!(topic.record.metadata["topic"], "outdoors");
        assert_eq!(topic.record.metadata["source"], "conversation");
    }

    #[tokio::test]
    async fn test_malformed_extraction_is_error() {
        let (memory, index, _) = manager_with("no facts here").await;
        assert!(memory.process_conversation("hi", "hello").await.is_err());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_close() {
        let (memory, index, _) = manager_with("[]").await;
        let id = memory.add_fact("apples", BTreeMap::new()).await.unwrap();
        memory.delete_memory(&id).await.unwrap();
        assert_eq!(memory.count(), 0);

        memory.close().await.unwrap();
        memory.close().await.unwrap();
        assert!(index.is_closed());
        assert!(memory.is_closed());

        let err = memory.add_memory("x", MemoryType::Fact, BTreeMap::new()).await;
        assert!(matches!(err, Err(AiError::Memory(msg)) if msg == "memory manager closed"));
        assert!(memory.search_memory("x", 1).await.is_err());
        assert_eq!(memory.get_context("x", 500).await.unwrap(), "");
    }
}
