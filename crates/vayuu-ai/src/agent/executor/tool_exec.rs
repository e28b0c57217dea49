use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;
use crate::llm::{Message, ToolCall};
use crate::tools::{ToolContext, ToolOutput};

use super::AgentExecutor;

const RESULT_PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    match text.char_indices().nth(RESULT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl AgentExecutor {
    /// Run every requested call in order and append one tool-result message per call.
    pub(crate) async fn dispatch_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        ctx: &ToolContext,
        messages: &mut Vec<Message>,
    ) {
        info!(count = tool_calls.len(), "Dispatching tool calls");

        for (index, call) in tool_calls.iter().enumerate() {
            let started = Instant::now();
            let content = self.invoke_tool(call, ctx).await;
            info!(
                tool = %call.name,
                duration_ms = started.elapsed().as_millis() as u64,
                "Tool executed"
            );
            debug!(
                index = index + 1,
                tool = %call.name,
                preview = %preview(&content),
                "Tool result"
            );
            messages.push(Message::tool_result(&call.id, content));
        }
    }

    /// Resolve, parse and execute one call, rendering any failure as result text.
    async fn invoke_tool(&self, call: &ToolCall, ctx: &ToolContext) -> String {
        if !self.tools.has(&call.name) {
            return format!(
                "error: unknown tool {:?} (available: {})",
                call.name,
                self.tools.list().join(", ")
            );
        }

        let args = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str::<Value>(&call.arguments) {
                Ok(args) => args,
                Err(e) => return format!("error: invalid arguments for {}: {}", call.name, e),
            }
        };

        // A panicking tool only takes down its own task.
        let tools = Arc::clone(&self.tools);
        let name = call.name.clone();
        let ctx = ctx.clone();
        let handle: JoinHandle<Result<ToolOutput>> =
            tokio::spawn(async move { tools.execute(&name, args, &ctx).await });

        match handle.await {
            Ok(Ok(output)) => output.into_message_content(),
            Ok(Err(e)) => format!("error: {}", e),
            Err(e) => format!("error: Tool task panicked: {}", e),
        }
    }
}
