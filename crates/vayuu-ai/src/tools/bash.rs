//! Shell command execution tool for the agent
//!
//! Provides `execute_command` with:
//! - A single command or a batch of up to 20 commands, run sequentially
//! - `bash -c` in the workspace directory
//! - Per-command timeout (default 30s)
//! - Combined stdout/stderr capped at 10MB
//!
//! # Example
//!
//! ```ignore
//! let tool = ExecuteCommandTool::new(Workspace::new("/srv/agent"));
//! let output = tool.execute(serde_json::json!({
//!     "command": ["ls -la", "git status"]
//! }), &ToolContext::default()).await?;
//! ```

use async_trait::async_trait;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{Duration, timeout};

use super::traits::{Tool, ToolContext, ToolOutput};
use super::workspace::{Workspace, format_bytes};
use crate::error::Result;

/// Default timeout for command execution in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum combined output size in bytes (10MB)
const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum commands accepted in one call
pub const MAX_COMMANDS: usize = 20;

#[derive(Debug, Clone)]
pub struct ExecuteCommandTool {
    workspace: Workspace,
    /// Command timeout in seconds
    timeout_secs: u64,
    /// Maximum output size in bytes
    max_output_bytes: usize,
}

impl ExecuteCommandTool {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Set command timeout in seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set maximum output size in bytes
    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Run one command, returning its output or an error description.
    async fn run_one(&self, command: &str) -> std::result::Result<String, String> {
        if command.trim().is_empty() {
            return Err("command is empty".to_string());
        }

        tracing::debug!(cmd = %command, dir = %self.workspace.root().display(), "Executing command");
        let start = Instant::now();

        let mut child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(self.workspace.root())
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to start command: {}", e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = self.max_output_bytes;
        let run = async {
            let (out, err) = tokio::try_join!(read_capped(stdout, cap), read_capped(stderr, cap))?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out, err))
        };

        let (status, (mut combined, out_total), (stderr, err_total)) =
            match timeout(Duration::from_secs(self.timeout_secs), run).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return Err(format!("failed to run command: {}", e)),
                Err(_) => {
                    return Err(format!(
                        "command timed out after {}s",
                        self.timeout_secs
                    ));
                }
            };

        combined.extend_from_slice(&stderr);
        let text = self.truncate_output(&combined, out_total + err_total);

        tracing::debug!(
            cmd = %command,
            duration_ms = start.elapsed().as_millis() as u64,
            status = ?status.code(),
            "Command finished"
        );

        if status.success() {
            Ok(text)
        } else {
            let code = status.code().unwrap_or(-1);
            Err(format!("exit code {}\noutput: {}", code, text))
        }
    }

    /// Truncate output if it exceeds max size. `total` counts every byte
    /// the command wrote, including those never buffered.
    fn truncate_output(&self, bytes: &[u8], total: u64) -> String {
        if total <= self.max_output_bytes as u64 && bytes.len() <= self.max_output_bytes {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(self.max_output_bytes)]);
        format!(
            "{}...\n[Output truncated, {} total]",
            head,
            format_bytes(total)
        )
    }

    async fn run_batch(&self, commands: &[Value]) -> ToolOutput {
        if commands.is_empty() {
            return ToolOutput::error("command array is empty");
        }
        if commands.len() > MAX_COMMANDS {
            return ToolOutput::error(format!("too many commands (max {})", MAX_COMMANDS));
        }

        let mut batch = Vec::with_capacity(commands.len());
        for (i, entry) in commands.iter().enumerate() {
            match entry.as_str() {
                Some(cmd) if !cmd.trim().is_empty() => batch.push(cmd),
                Some(_) => return ToolOutput::error(format!("command[{}] is empty", i)),
                None => return ToolOutput::error(format!("command[{}] must be a string", i)),
            }
        }

        let mut sections = Vec::with_capacity(batch.len());
        for (i, cmd) in batch.into_iter().enumerate() {
            let section = match self.run_one(cmd).await {
                Ok(out) => format!("=== command {}: {} ===\n{}", i + 1, cmd, out),
                Err(e) => format!("command {} failed: {}\nerror: {}", i + 1, cmd, e),
            };
            sections.push(section);
        }
        ToolOutput::success(sections.join("\n\n"))
    }
}

/// Drain `reader` to the end, keeping at most `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: Option<R>,
    cap: usize,
) -> std::io::Result<(Vec<u8>, u64)> {
    let mut kept = Vec::new();
    let mut total = 0u64;
    let Some(mut reader) = reader else {
        return Ok((kept, total));
    };
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        let room = cap.saturating_sub(kept.len());
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok((kept, total))
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute bash command(s) on the local system inside the workspace directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Command or list of commands to run in order"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(match input.get("command") {
            Some(Value::String(cmd)) => match self.run_one(cmd).await {
                Ok(out) => ToolOutput::success(out),
                Err(e) => ToolOutput::error(e),
            },
            Some(Value::Array(cmds)) => self.run_batch(cmds).await,
            _ => ToolOutput::error("command must be a string or array of strings"),
        })
    }
}
