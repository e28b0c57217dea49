//! Delivers a workspace file to the chat the current turn came from.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::fs;

use super::traits::{Tool, ToolContext, ToolOutput};
use super::workspace::Workspace;
use crate::error::Result;
use crate::transport::ChatTransport;

pub struct SendFileTool {
    workspace: Workspace,
    transport: Arc<dyn ChatTransport>,
}

impl SendFileTool {
    pub fn new(workspace: Workspace, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            workspace,
            transport,
        }
    }
}

#[async_trait]
impl Tool for SendFileTool {
    fn name(&self) -> &str {
        "send_file"
    }

    fn description(&self) -> &str {
        "Send a file (image, video or document) to the user in the current chat."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path to the file to send"},
                "caption": {"type": "string", "description": "Optional caption for the file"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let Some(raw) = input.get("path").and_then(Value::as_str) else {
            return Ok(ToolOutput::error("path must be a string"));
        };
        let caption = input
            .get("caption")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty());

        let Some(chat_id) = ctx.chat_id else {
            return Ok(ToolOutput::error("no active chat"));
        };

        let path = match self.workspace.resolve(raw) {
            Ok(path) => path,
            Err(e) => return Ok(ToolOutput::error(e)),
        };
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                return Ok(ToolOutput::error("path is a directory, not a file"));
            }
            Ok(_) => {}
            Err(e) => return Ok(ToolOutput::error(format!("file not found: {}", e))),
        }

        // Transport failures are reported to the model, not raised.
        if let Err(e) = self.transport.send_file(chat_id, &path, caption).await {
            return Ok(ToolOutput::error(format!("failed to send file: {}", e)));
        }
        Ok(ToolOutput::success(format!("content sent: {}", raw)))
    }
}
