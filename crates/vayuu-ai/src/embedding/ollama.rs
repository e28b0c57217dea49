//! Ollama `/api/embeddings` client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{AiError, Result};
use crate::http_client::build_http_client;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_OLLAMA_DIMENSION: usize = 768;

pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    config: EmbeddingConfig,
}

impl OllamaEmbedding {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        let config = EmbeddingConfig {
            model: model.into(),
            dimension,
            timeout_secs: 30,
        };
        Self {
            client: build_http_client(Duration::from_secs(config.timeout_secs)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaEmbedding {
    fn default() -> Self {
        Self::new(
            DEFAULT_OLLAMA_URL,
            DEFAULT_OLLAMA_MODEL,
            DEFAULT_OLLAMA_DIMENSION,
        )
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let normalized = self.normalize_text(text);
        let request = EmbeddingRequest {
            model: &self.config.model,
            prompt: &normalized,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Embedding(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let data: EmbeddingResponse = response.json().await?;
        if data.embedding.is_empty() {
            return Err(AiError::Embedding("Ollama returned an empty embedding".to_string()));
        }
        if data.embedding.len() != self.config.dimension {
            return Err(AiError::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.config.dimension,
                data.embedding.len()
            )));
        }
        Ok(data.embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
