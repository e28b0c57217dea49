//! The contract every workspace tool implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Function definition advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema object
    pub parameters: Value,
}

/// Per-turn data handed to every tool invocation but never shown to the model.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Chat the current turn belongs to, when it came from a transport.
    pub chat_id: Option<i64>,
}

impl ToolContext {
    pub fn for_chat(chat_id: i64) -> Self {
        Self {
            chat_id: Some(chat_id),
        }
    }
}

/// What a tool hands back. Failures the model should see are `success: false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub result: String,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: result.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: String::new(),
            error: Some(message.into()),
        }
    }

    /// Text fed back to the model as the tool-result message.
    pub fn into_message_content(self) -> String {
        if self.success {
            self.result
        } else {
            format!(
                "error: {}",
                self.error.unwrap_or_else(|| "unknown error".to_string())
            )
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key and function name shown to the model
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    /// `Err` is reserved for faults; the dispatcher renders both `Err` and
    /// error outputs as `error: <msg>`.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_output_renders_prefix() {
        assert_eq!(
            ToolOutput::error("file not found").into_message_content(),
            "error: file not found"
        );
        assert_eq!(ToolOutput::success("ok").into_message_content(), "ok");
    }
}
