//! Tool registry for managing available tools

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AiError, Result};
use crate::tools::traits::{Tool, ToolContext, ToolOutput, ToolSchema};

/// Registry for managing available tools.
///
/// Registration takes `&mut self`, so it happens before the registry is
/// shared; once wrapped in an `Arc` the set is read-only and lock-free.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting empty or duplicate names
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from Arc
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().trim().to_string();
        if name.is_empty() {
            return Err(AiError::Tool("Tool name is required".to_string()));
        }
        if self.tools.contains_key(&name) {
            return Err(AiError::DuplicateTool(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get schemas for all registered tools, in name order so requests are stable
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.schema())
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, input: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let tool = self.get(name).ok_or_else(|| {
            AiError::ToolNotFound(format!("{} (available: {})", name, self.list().join(", ")))
        })?;
        tool.execute(input, ctx).await
    }
}
