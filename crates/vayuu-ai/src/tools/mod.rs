//! Tools module - agent tool definitions and the workspace tool set

mod bash;
mod edit;
mod file;
mod registry;
mod send_file;
mod traits;
mod workspace;

use std::sync::Arc;

pub use bash::ExecuteCommandTool;
pub use edit::{EditError, EditFileTool, replace_once};
pub use file::{ReadFileTool, WriteFileTool};
pub use registry::ToolRegistry;
pub use send_file::SendFileTool;
pub use traits::{Tool, ToolContext, ToolOutput, ToolSchema};
pub use workspace::{Workspace, format_bytes};

use crate::error::Result;
use crate::transport::ChatTransport;

/// Registry with every workspace tool; `send_file` needs a transport.
pub fn default_registry(
    workspace: Workspace,
    transport: Option<Arc<dyn ChatTransport>>,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool::new(workspace.clone()))?;
    registry.register(WriteFileTool::new(workspace.clone()))?;
    registry.register(EditFileTool::new(workspace.clone()))?;
    registry.register(ExecuteCommandTool::new(workspace.clone()))?;
    if let Some(transport) = transport {
        registry.register(SendFileTool::new(workspace, transport))?;
    }
    Ok(registry)
}
