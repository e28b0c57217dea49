//! Agent module - the tool-calling conversation loop

mod executor;
mod prompt;
mod thinking;

pub use executor::{AgentConfig, AgentExecutor, TurnContext};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, WORKSPACE_PROMPT_FILES, build_system_prompt};
pub use thinking::strip_thinking_tags;
