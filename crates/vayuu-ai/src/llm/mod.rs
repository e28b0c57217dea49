//! LLM module - provider-selected LLM client abstraction

mod client;
mod factory;
mod openai;
mod retry;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
    ToolCall,
};
pub use factory::{LlmProvider, create_llm_client};
pub use openai::OpenAIClient;
pub use retry::LlmRetryConfig;
