//! File read/write tools for the agent workspace
//!
//! Provides:
//! - `read_file`: one path or a list of paths, size-limited
//! - `write_file`: full overwrite with auto-creation of parent directories
//!
//! All paths go through [`Workspace::resolve`].

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::fs;

use super::traits::{Tool, ToolContext, ToolOutput};
use super::workspace::{Workspace, format_bytes};
use crate::error::Result;

/// Maximum file size to read (5MB)
pub const MAX_READ_BYTES: u64 = 5 * 1024 * 1024;

/// Reads one or more workspace files
#[derive(Debug, Clone)]
pub struct ReadFileTool {
    workspace: Workspace,
    max_read_bytes: u64,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            max_read_bytes: MAX_READ_BYTES,
        }
    }

    /// Set maximum file size in bytes
    pub fn with_max_read_bytes(mut self, bytes: u64) -> Self {
        self.max_read_bytes = bytes;
        self
    }

    async fn read_one(&self, raw: &str) -> std::result::Result<String, String> {
        let path = self.workspace.resolve(raw)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| format!("cannot access {}: {}", raw, e))?;
        if metadata.is_dir() {
            return Err("path is a directory, not a file".to_string());
        }
        if metadata.len() > self.max_read_bytes {
            return Err(format!(
                "file too large ({}, max {})",
                format_bytes(metadata.len()),
                format_bytes(self.max_read_bytes)
            ));
        }
        let bytes = fs::read(&path)
            .await
            .map_err(|e| format!("failed to read {}: {}", raw, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of one or more files. Paths are relative to the workspace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "File path or list of file paths to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        match input.get("path") {
            Some(Value::String(path)) => Ok(match self.read_one(path).await {
                Ok(content) => ToolOutput::success(content),
                Err(e) => ToolOutput::error(e),
            }),
            Some(Value::Array(paths)) => {
                let mut sections = Vec::with_capacity(paths.len());
                for (i, entry) in paths.iter().enumerate() {
                    let Some(path) = entry.as_str() else {
                        return Ok(ToolOutput::error(format!("path[{}] must be a string", i)));
                    };
                    let body = match self.read_one(path).await {
                        Ok(content) => content,
                        Err(e) => format!("error: {}", e),
                    };
                    sections.push(format!("=== {} ===\n{}", path, body));
                }
                Ok(ToolOutput::success(sections.join("\n\n")))
            }
            _ => Ok(ToolOutput::error(
                "path must be a string or array of strings",
            )),
        }
    }
}

/// Writes a workspace file, replacing any previous content
#[derive(Debug, Clone)]
pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories when needed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Destination file path"},
                "content": {"type": "string", "description": "Full file content"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let (Some(raw), Some(content)) = (
            input.get("path").and_then(Value::as_str),
            input.get("content").and_then(Value::as_str),
        ) else {
            return Ok(ToolOutput::error("'path' and 'content' must be strings"));
        };

        let path = match self.workspace.resolve(raw) {
            Ok(path) => path,
            Err(e) => return Ok(ToolOutput::error(e)),
        };
        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            return Ok(ToolOutput::error(format!("failed to create directory: {}", e)));
        }
        if let Err(e) = fs::write(&path, content).await {
            return Ok(ToolOutput::error(format!("failed to write file: {}", e)));
        }

        Ok(ToolOutput::success(format!(
            "wrote {} to {}",
            format_bytes(content.len() as u64),
            raw
        )))
    }
}
