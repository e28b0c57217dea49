//! Provider selection for the completion client

use std::str::FromStr;
use std::sync::Arc;

use crate::error::AiError;
use crate::llm::{LlmClient, OpenAIClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LlmProvider {
    OpenAI,
    Groq,
    Ollama,
    /// Any OpenAI-compatible endpoint; the configured base URL is used as is.
    #[default]
    Custom,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
            Self::Custom => "custom",
        }
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::Custom => None,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            "" | "custom" => Ok(Self::Custom),
            other => Err(AiError::Llm(format!("Unknown LLM provider: {}", other))),
        }
    }
}

/// Build the completion client for `provider`.
///
/// An explicit `base_url` always wins over the provider default.
pub fn create_llm_client(
    provider: LlmProvider,
    api_key: &str,
    base_url: Option<&str>,
    model: &str,
) -> crate::error::Result<Arc<dyn LlmClient>> {
    let base_url = base_url
        .filter(|url| !url.trim().is_empty())
        .or(provider.default_base_url())
        .ok_or_else(|| AiError::Llm("A base URL is required for a custom provider".to_string()))?;

    let client = OpenAIClient::new(api_key)
        .with_base_url(base_url)
        .with_model(model)
        .with_provider_name(provider.as_str());
    Ok(Arc::new(client))
}
