//! LLM-driven extraction of user facts from a finished turn

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message};

const EXTRACTION_TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str =
    "You extract structured facts from conversations. Always respond with valid JSON array.";

const EXTRACTION_PROMPT: &str = r#"Analyze the following conversation and extract structured information about the user.

Extract facts in this JSON format:
[
  {"type": "fact", "key": "key_name", "value": "the fact"},
  {"type": "preference", "key": "preference_name", "value": "the preference", "category": "category"},
  {"type": "topic", "key": "topic_name", "value": "topic"}
]

Rules:
- Only extract if there's clear new information about the user
- "key" should be lowercase snake_case
- "category" for preferences: food, hobby, work, communication, other
- Return empty array if nothing significant to extract
- Keep values concise (under 50 words)

Conversation:
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractedKind {
    Fact,
    Preference,
    Topic,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedFact {
    #[serde(rename = "type")]
    pub kind: ExtractedKind,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub category: Option<String>,
}

pub struct FactExtractor {
    llm: Arc<dyn LlmClient>,
}

impl FactExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn extract(&self, user_input: &str, assistant_response: &str) -> Result<Vec<ExtractedFact>> {
        let conversation = format!("User: {user_input}\nAssistant: {assistant_response}");
        let request = CompletionRequest::new(vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("{EXTRACTION_PROMPT}{conversation}")),
        ])
        .with_temperature(EXTRACTION_TEMPERATURE);

        let response = self.llm.complete(request).await?;
        let content = response.content.unwrap_or_default();
        parse_facts(&content)
    }
}

/// Parse the model reply, tolerating a surrounding Markdown code fence.
pub fn parse_facts(content: &str) -> Result<Vec<ExtractedFact>> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let unfenced = unfenced.strip_suffix("```").unwrap_or(unfenced).trim();

    serde_json::from_str(unfenced)
        .map_err(|e| AiError::Memory(format!("failed to parse extracted facts: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let facts = parse_facts(r#"[{"type":"fact","key":"name","value":"Alex"}]"#).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].kind, ExtractedKind::Fact);
        assert_eq!(facts[0].key, "name");
        assert_eq!(facts[0].category, None);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n[{\"type\":\"preference\",\"key\":\"hiking\",\"value\":\"hiking\",\"category\":\"hobby\"}]\n```";
        let facts = parse_facts(reply).unwrap();
        assert_eq!(facts[0].kind, ExtractedKind::Preference);
        assert_eq!(facts[0].category.as_deref(), Some("hobby"));

        assert!(parse_facts("```\n[]\n```").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_kind_and_garbage() {
        let facts = parse_facts(r#"[{"type":"opinion","key":"k","value":"v"}]"#).unwrap();
        assert_eq!(facts[0].kind, ExtractedKind::Unknown);

        assert!(matches!(parse_facts("I found nothing"), Err(AiError::Memory(_))));
    }
}
