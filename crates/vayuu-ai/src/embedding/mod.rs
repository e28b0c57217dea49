mod ollama;
mod provider;

pub use ollama::{DEFAULT_OLLAMA_DIMENSION, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, OllamaEmbedding};
pub use provider::{EmbeddingConfig, EmbeddingProvider};
