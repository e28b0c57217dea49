//! Outbound chat transport contract.
//!
//! The agent core never talks to a chat platform directly; the binary plugs a
//! concrete transport (Telegram) in here.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a text message to `chat_id`.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Deliver a local file with an optional caption.
    async fn send_file(&self, chat_id: i64, path: &Path, caption: Option<&str>) -> Result<()>;

    /// Show the "typing..." indicator.
    async fn send_typing(&self, chat_id: i64) -> Result<()>;
}
