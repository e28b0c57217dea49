//! Edit tool for exact string replacement in workspace files.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::fs;

use super::traits::{Tool, ToolContext, ToolOutput};
use super::workspace::{Workspace, format_bytes};
use crate::error::Result;

#[derive(Debug, PartialEq, Eq)]
pub enum EditError {
    NotFound,
    MultipleMatches { count: usize },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "old_string not found in file. Check exact whitespace and line breaks."
            ),
            Self::MultipleMatches { count } => write!(
                f,
                "old_string appears {count} times. Provide a more specific match."
            ),
        }
    }
}

/// Replace the single occurrence of `old` in `content`.
pub fn replace_once(content: &str, old: &str, new: &str) -> std::result::Result<String, EditError> {
    match content.matches(old).count() {
        0 => Err(EditError::NotFound),
        1 => Ok(content.replacen(old, new, 1)),
        count => Err(EditError::MultipleMatches { count }),
    }
}

#[derive(Debug, Clone)]
pub struct EditFileTool {
    workspace: Workspace,
}

impl EditFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing an exact string match with a new string. The old_string must appear exactly once."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path to the file to edit"},
                "old_string": {"type": "string", "description": "Exact string to find (must match once)"},
                "new_string": {"type": "string", "description": "Replacement string"}
            },
            "required": ["path", "old_string", "new_string"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let (Some(raw), Some(old), Some(new)) = (
            input.get("path").and_then(Value::as_str),
            input.get("old_string").and_then(Value::as_str),
            input.get("new_string").and_then(Value::as_str),
        ) else {
            return Ok(ToolOutput::error(
                "'path', 'old_string', and 'new_string' must be strings",
            ));
        };
        if old.is_empty() {
            return Ok(ToolOutput::error("old_string must not be empty"));
        }

        let path = match self.workspace.resolve(raw) {
            Ok(path) => path,
            Err(e) => return Ok(ToolOutput::error(e)),
        };
        let original = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => return Ok(ToolOutput::error(format!("failed to read file: {}", e))),
        };

        let updated = match replace_once(&original, old, new) {
            Ok(updated) => updated,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };
        if let Err(e) = fs::write(&path, &updated).await {
            return Ok(ToolOutput::error(format!("failed to write file: {}", e)));
        }

        let old_lines = old.matches('\n').count() + 1;
        let new_lines = new.matches('\n').count() + 1;
        let delta = match updated.len() as i64 - original.len() as i64 {
            0 => "no size change".to_string(),
            d if d > 0 => format!("+{}", format_bytes(d as u64)),
            d => format!("-{}", format_bytes(d.unsigned_abs())),
        };

        Ok(ToolOutput::success(format!(
            "edited {}: replaced {} line(s) with {} line(s) ({})",
            raw, old_lines, new_lines, delta
        )))
    }
}
