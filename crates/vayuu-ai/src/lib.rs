//! Vayuu AI - conversational agent core
//!
//! This crate provides:
//! - Tool-calling agent loop with iteration, error and cancellation bounds
//! - OpenAI-compatible LLM client selected per provider
//! - Tool registry and the workspace tools (file, edit, shell, send file)
//! - Short-term memory (sliding window of user/assistant pairs)
//! - Long-term memory (embeddings, vector recall, fact extraction)
//! - Daily JSONL conversation log with size-based rotation

pub mod agent;
pub mod embedding;
pub mod error;
mod http_client;
pub mod llm;
pub mod memory;
pub mod tools;
pub mod transport;
pub mod vector;

// Re-export commonly used types
pub use agent::{AgentConfig, AgentExecutor, TurnContext, strip_thinking_tags};
pub use embedding::{EmbeddingProvider, OllamaEmbedding};
pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmClient, LlmProvider, Message, OpenAIClient, Role,
    ToolCall, create_llm_client,
};
pub use memory::{
    ConversationLogger, DEFAULT_STM_CAPACITY, LongTermMemory, MemoryRecord, MemoryType,
    ScoredRecord, ShortTermMemory,
};
pub use tools::{Tool, ToolContext, ToolOutput, ToolRegistry, ToolSchema};
pub use transport::ChatTransport;
pub use vector::{InMemoryIndex, QdrantIndex, ScoredPoint, VectorIndex};
