use std::path::PathBuf;

use crate::agent::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: usize = 3;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Token budget for recalled long-term memories
pub const DEFAULT_CONTEXT_TOKENS: usize = 500;

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub system_prompt: String,
    /// Workspace root holding `SOUL.md` and `USER.md`; read on every turn.
    pub workspace: Option<PathBuf>,
    /// Completion requests allowed per turn, failed ones included.
    pub max_iterations: usize,
    /// Failed completions in a row before the turn is abandoned.
    pub max_consecutive_errors: usize,
    pub temperature: f32,
    pub context_tokens: usize,
    pub max_output_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            workspace: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            temperature: DEFAULT_TEMPERATURE,
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            max_output_tokens: None,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Set max iterations
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_consecutive_errors(mut self, max: usize) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_context_tokens(mut self, tokens: usize) -> Self {
        self.context_tokens = tokens;
        self
    }

    /// Set max output tokens for each LLM request.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}
