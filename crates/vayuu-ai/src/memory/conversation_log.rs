//! Daily JSONL conversation log
//!
//! Every completed turn is appended to `<workdir>/memory/YYYY-MM-DD.jsonl`,
//! one `{"timestamp","role","content"}` object per line. Only user and
//! assistant messages are written. When the day's file has reached the size
//! threshold it is renamed to `<file>.<unix_seconds>` and a fresh file is
//! started, so no line is ever lost to rotation.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::agent::strip_thinking_tags;
use crate::error::Result;
use crate::llm::{Message, Role};

/// Default rotation threshold (10 MiB)
pub const DEFAULT_MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    role: &'static str,
    content: &'a str,
}

pub struct ConversationLogger {
    log_dir: PathBuf,
    max_size: u64,
    clock: Clock,
    write_lock: Mutex<()>,
}

impl fmt::Debug for ConversationLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationLogger")
            .field("log_dir", &self.log_dir)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl ConversationLogger {
    /// Logger writing under `<workdir>/memory`.
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: workdir.as_ref().join("memory"),
            max_size: DEFAULT_MAX_LOG_BYTES,
            clock: Arc::new(Local::now),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Replace the wall clock, used for file naming and line timestamps.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the file a write happening now would go to.
    pub fn current_path(&self) -> PathBuf {
        self.path_for(&(self.clock)())
    }

    fn path_for(&self, now: &DateTime<Local>) -> PathBuf {
        self.log_dir
            .join(format!("{}.jsonl", now.format("%Y-%m-%d")))
    }

    /// Append the user and assistant messages of a turn.
    ///
    /// Assistant text is logged with reasoning blocks removed; messages left
    /// empty are skipped. Concurrent callers are serialized.
    pub fn write(&self, messages: &[Message]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let now = (self.clock)();
        let timestamp = now.format("%H:%M:%S").to_string();

        let mut buffer = String::new();
        for message in messages {
            let content = match message.role {
                Role::User => message.content.trim().to_string(),
                Role::Assistant => strip_thinking_tags(&message.content),
                Role::System | Role::Tool => continue,
            };
            if content.is_empty() {
                continue;
            }
            let entry = LogEntry {
                timestamp: timestamp.clone(),
                role: message.role.as_str(),
                content: &content,
            };
            buffer.push_str(&serde_json::to_string(&entry)?);
            buffer.push('\n');
        }

        if buffer.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.log_dir)?;
        let path = self.path_for(&now);
        self.rotate_if_needed(&path, &now)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(buffer.as_bytes())?;
        debug!(path = %path.display(), bytes = buffer.len(), "Conversation logged");
        Ok(())
    }

    fn rotate_if_needed(&self, path: &Path, now: &DateTime<Local>) -> Result<()> {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if size < self.max_size {
            return Ok(());
        }

        let base = format!("{}.{}", path.display(), now.timestamp());
        let mut target = PathBuf::from(&base);
        let mut suffix = 1;
        while target.exists() {
            target = PathBuf::from(format!("{base}.{suffix}"));
            suffix += 1;
        }

        fs::rename(path, &target)?;
        info!(from = %path.display(), to = %target.display(), size, "Rotated conversation log");
        Ok(())
    }
}
