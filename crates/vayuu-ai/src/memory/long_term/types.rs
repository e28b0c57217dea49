use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AiError;
use crate::vector::{Payload, ScoredPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Fact,
    Preference,
    Knowledge,
    Conversation,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Preference => "preference",
            Self::Knowledge => "knowledge",
            Self::Conversation => "conversation",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = AiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fact" => Ok(Self::Fact),
            "preference" => Ok(Self::Preference),
            "knowledge" => Ok(Self::Knowledge),
            "conversation" => Ok(Self::Conversation),
            other => Err(AiError::Memory(format!("unknown memory type: {other}"))),
        }
    }
}

/// One remembered item as stored in the vector index payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        content: impl Into<String>,
        memory_type: MemoryType,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            memory_type,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Payload layout: `content`, `type`, `created_at` plus one string per metadata key.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        for (key, value) in &self.metadata {
            payload.insert(key.clone(), Value::String(value.clone()));
        }
        payload.insert("content".to_string(), Value::String(self.content.clone()));
        payload.insert(
            "type".to_string(),
            Value::String(self.memory_type.as_str().to_string()),
        );
        payload.insert(
            "created_at".to_string(),
            Value::String(self.created_at.to_rfc3339()),
        );
        payload
    }

    /// Rebuild a record from a stored payload. Unknown types read as knowledge.
    pub fn from_payload(id: impl Into<String>, payload: &Payload) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).unwrap_or_default();

        let memory_type = text("type").parse().unwrap_or(MemoryType::Knowledge);
        let created_at = DateTime::parse_from_rfc3339(text("created_at"))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let metadata = payload
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "content" | "type" | "created_at"))
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        Self {
            id: id.into(),
            content: text("content").to_string(),
            memory_type,
            metadata,
            created_at,
        }
    }

    /// `[type] content`, the line format used in prompt context.
    pub fn context_line(&self) -> String {
        format!("[{}] {}", self.memory_type, self.content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub score: f32,
}

impl From<ScoredPoint> for ScoredRecord {
    fn from(point: ScoredPoint) -> Self {
        Self {
            record: MemoryRecord::from_payload(point.id, &point.payload),
            score: point.score,
        }
    }
}
