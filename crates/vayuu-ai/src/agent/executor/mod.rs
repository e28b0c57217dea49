//! Agent executor
//!
//! One call to [`AgentExecutor::respond`] is one conversation turn:
//!
//! 1. Build the system prompt (base, workspace files, recalled memories,
//!    user summary) and replay short-term memory.
//! 2. Loop: request a completion; run any tool calls in request order and
//!    feed their results back; stop at the first answer without tool calls.
//! 3. Record the turn in short-term memory and the conversation log, then
//!    hand it to long-term extraction in the background.
//!
//! The loop is bounded by `max_iterations` completion requests and by
//! `max_consecutive_errors` failed requests in a row. Cancellation of the
//! turn's token is checked at the top of every pass and raced against the
//! in-flight completion; a cancelled turn records nothing.

mod config;
mod tool_exec;

pub use config::*;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::agent::{build_system_prompt, strip_thinking_tags};
use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::memory::{ConversationLogger, LongTermMemory, ShortTermMemory};
use crate::tools::{ToolContext, ToolRegistry};

/// Per-turn inputs supplied by the chat front end.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub chat_id: Option<i64>,
    pub cancel: CancellationToken,
}

impl TurnContext {
    pub fn new(chat_id: i64, cancel: CancellationToken) -> Self {
        Self {
            chat_id: Some(chat_id),
            cancel,
        }
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext {
            chat_id: self.chat_id,
        }
    }
}

pub struct AgentExecutor {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) tools: Arc<ToolRegistry>,
    config: AgentConfig,
    stm: Arc<ShortTermMemory>,
    logger: Option<Arc<ConversationLogger>>,
    memory: Option<Arc<LongTermMemory>>,
    background: TaskTracker,
}

impl AgentExecutor {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            llm,
            tools,
            config,
            stm: Arc::new(ShortTermMemory::default()),
            logger: None,
            memory: None,
            background: TaskTracker::new(),
        }
    }

    pub fn with_short_term_memory(mut self, stm: Arc<ShortTermMemory>) -> Self {
        self.stm = stm;
        self
    }

    pub fn with_logger(mut self, logger: Arc<ConversationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_long_term_memory(mut self, memory: Arc<LongTermMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn short_term_memory(&self) -> &Arc<ShortTermMemory> {
        &self.stm
    }

    pub fn long_term_memory(&self) -> Option<&Arc<LongTermMemory>> {
        self.memory.as_ref()
    }

    /// Stop accepting background work and wait for pending memory extraction.
    pub async fn drain_background(&self) {
        self.background.close();
        self.background.wait().await;
    }

    /// Answer one user message.
    pub async fn respond(&self, turn: &TurnContext, input: &str) -> Result<String> {
        info!(input_len = input.len(), "Agent invoked");
        if turn.cancel.is_cancelled() {
            return Err(AiError::Cancelled);
        }

        let system_prompt = self.turn_system_prompt(turn, input).await?;
        let mut messages = vec![Message::system(system_prompt)];
        messages.extend(self.stm.history());
        let turn_start = messages.len();
        messages.push(Message::user(input));

        let answer = self.run_loop(turn, &mut messages).await?;

        self.stm.add_exchange(input, &answer);

        if let Some(logger) = &self.logger
            && let Err(e) = logger.write(&messages[turn_start..])
        {
            warn!(error = %e, "Failed to write conversation log");
        }

        if let Some(memory) = &self.memory
            && !answer.is_empty()
        {
            let memory = Arc::clone(memory);
            let user_input = input.to_string();
            let response = answer.clone();
            self.background.spawn(async move {
                if let Err(e) = memory.process_conversation(&user_input, &response).await {
                    warn!(error = %e, "Long-term memory extraction failed");
                }
            });
        }

        info!(response_len = answer.len(), "Agent completed");
        Ok(answer)
    }

    async fn turn_system_prompt(&self, turn: &TurnContext, input: &str) -> Result<String> {
        let mut prompt =
            build_system_prompt(&self.config.system_prompt, self.config.workspace.as_deref());

        let Some(memory) = &self.memory else {
            return Ok(prompt);
        };

        let recalled = tokio::select! {
            biased;
            _ = turn.cancel.cancelled() => return Err(AiError::Cancelled),
            result = memory.get_context(input, self.config.context_tokens) => result,
        };
        match recalled {
            Ok(context) if !context.is_empty() => {
                prompt.push_str("\n\n");
                prompt.push_str(&context);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to recall memory context"),
        }

        match memory.user_summary() {
            Ok(summary) if !summary.is_empty() => {
                prompt.push_str("\n\n");
                prompt.push_str(&summary);
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "No user summary available"),
        }

        Ok(prompt)
    }

    async fn run_loop(&self, turn: &TurnContext, messages: &mut Vec<Message>) -> Result<String> {
        let tool_ctx = turn.tool_context();
        let max_iterations = self.config.max_iterations;
        let max_errors = self.config.max_consecutive_errors;
        let mut iterations = 0usize;
        let mut consecutive_errors = 0usize;

        loop {
            if turn.cancel.is_cancelled() {
                return Err(AiError::Cancelled);
            }
            if iterations >= max_iterations {
                return Err(AiError::MaxIterations(max_iterations));
            }
            if consecutive_errors >= max_errors {
                return Err(AiError::ConsecutiveLlmErrors(max_errors));
            }
            iterations += 1;

            let mut request = CompletionRequest::new(messages.clone())
                .with_tools(self.tools.schemas())
                .with_temperature(self.config.temperature);
            if let Some(max_tokens) = self.config.max_output_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let result = tokio::select! {
                biased;
                _ = turn.cancel.cancelled() => return Err(AiError::Cancelled),
                result = self.llm.complete(request) => result,
            };

            let response = match result {
                Ok(response) => {
                    consecutive_errors = 0;
                    response
                }
                Err(e) => {
                    consecutive_errors += 1;
                    error!(
                        attempt = consecutive_errors,
                        max = max_errors,
                        error = %e,
                        "LLM request failed"
                    );
                    continue;
                }
            };

            if !response.has_tool_calls() {
                let content = response.content.unwrap_or_default();
                let answer = strip_thinking_tags(&content);
                messages.push(Message::assistant(content));
                debug!(iterations, "Final answer produced");
                return Ok(answer);
            }

            messages.push(Message::assistant_with_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));
            self.dispatch_tool_calls(&response.tool_calls, &tool_ctx, messages)
                .await;
        }
    }
}
