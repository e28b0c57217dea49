//! Telegram Channel Implementation
//!
//! Talks to the Bot API over plain HTTPS: long-polling `getUpdates` for
//! inbound messages, `sendMessage`/`sendChatAction` for text and multipart
//! uploads for files.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vayuu_ai::{AiError, ChatTransport};

use super::chunk::{DEFAULT_CHUNK_CHARS, chunk_message};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
/// Default timeout for Telegram API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;
/// Uploads larger than this are refused by the Bot API
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// How a local file is uploaded, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => Self::Photo,
            "mp4" | "mov" | "avi" | "mkv" | "webm" | "flv" => Self::Video,
            _ => Self::Document,
        }
    }

    fn method(self) -> &'static str {
        match self {
            Self::Photo => "sendPhoto",
            Self::Video => "sendVideo",
            Self::Document => "sendDocument",
        }
    }

    fn field(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

/// A text-bearing update as seen by the bot handler.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub username: Option<String>,
    pub text: Option<String>,
}

pub struct TelegramChannel {
    token: String,
    api_base: String,
    client: Client,
    polling_timeout: u32,
    /// Last update ID for long-polling
    last_update_id: AtomicI64,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: TELEGRAM_API_BASE.to_string(),
            client: Client::new(),
            polling_timeout: 30,
            last_update_id: AtomicI64::new(0),
        }
    }

    /// Point the channel at another Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Long-poll timeout in seconds
    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn parse_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        let parsed: TelegramResponse<T> = serde_json::from_str(&body)
            .map_err(|_| anyhow!("Telegram HTTP error {} on {}: {}", status, method, body))?;

        if !parsed.ok {
            bail!(
                "Telegram API error on {}: {}",
                method,
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;
        Self::parse_response(method, response).await
    }

    /// Identity of the bot behind the token.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", &json!({})).await
    }

    async fn send_chunk(&self, chat_id: i64, text: &str, parse_mode: Option<&str>) -> Result<()> {
        let mut params = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            params["parse_mode"] = Value::String(mode.to_string());
        }
        let _: TelegramMessageResponse = self.call("sendMessage", &params).await?;
        Ok(())
    }

    /// Send text, chunked; each chunk is retried as plain text when
    /// Telegram cannot parse its Markdown.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in chunk_message(text, DEFAULT_CHUNK_CHARS) {
            if let Err(e) = self.send_chunk(chat_id, &chunk, Some("Markdown")).await {
                debug!(chat_id, error = %e, "Markdown send failed, retrying as plain text");
                self.send_chunk(chat_id, &chunk, None).await?;
            }
        }
        Ok(())
    }

    /// Send typing indicator (chat action) to show the bot is processing
    pub async fn send_chat_action(&self, chat_id: i64) -> Result<()> {
        let params = json!({
            "chat_id": chat_id,
            "action": "typing",
        });
        let _: bool = self.call("sendChatAction", &params).await?;
        debug!(chat_id, "Sent typing indicator");
        Ok(())
    }

    /// Upload a local file as photo, video or document.
    pub async fn send_media(&self, chat_id: i64, path: &Path, caption: Option<&str>) -> Result<()> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| anyhow!("file does not exist: {}", e))?;
        if meta.len() > MAX_UPLOAD_BYTES {
            bail!(
                "file too large ({:.2} MB, max 50 MB)",
                meta.len() as f64 / (1024.0 * 1024.0)
            );
        }

        let kind = MediaKind::from_path(path);
        let bytes = fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file")
            .to_string();

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(kind.field(), Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = caption.filter(|c| !c.is_empty()) {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.api_url(kind.method()))
            .multipart(form)
            .timeout(Duration::from_secs(API_TIMEOUT_SECS * 4))
            .send()
            .await?;
        let _: TelegramMessageResponse = Self::parse_response(kind.method(), response).await?;

        info!(chat_id, path = %path.display(), kind = ?kind, "File sent");
        Ok(())
    }

    /// One `getUpdates` round.
    pub async fn poll_updates(&self) -> Result<Vec<IncomingMessage>> {
        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.polling_timeout,
            "allowed_updates": ["message"],
        });

        let response = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&params)
            .timeout(Duration::from_secs(self.polling_timeout as u64 + 10))
            .send()
            .await?;
        let updates: Vec<TelegramUpdate> = Self::parse_response("getUpdates", response).await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }

        Ok(updates.into_iter().filter_map(convert_update).collect())
    }

    /// Poll until `shutdown` fires, handing every message to `handler`.
    pub async fn run_polling<F>(&self, shutdown: CancellationToken, handler: F)
    where
        F: Fn(IncomingMessage) + Send + Sync,
    {
        info!("Starting Telegram polling");
        loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.poll_updates() => result,
            };

            match result {
                Ok(messages) => {
                    for message in messages {
                        debug!(
                            update_id = message.update_id,
                            chat_id = message.chat_id,
                            "Received Telegram message"
                        );
                        handler(message);
                    }
                }
                Err(e) => {
                    error!("Telegram polling error: {:#}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                    }
                }
            }
        }
        info!("Telegram polling stopped");
    }
}

fn convert_update(update: TelegramUpdate) -> Option<IncomingMessage> {
    let Some(message) = update.message else {
        warn!(update_id = update.update_id, "Skipping update without message");
        return None;
    };
    Some(IncomingMessage {
        update_id: update.update_id,
        chat_id: message.chat.id,
        message_id: message.message_id,
        username: message.from.and_then(|from| from.username),
        text: message.text,
    })
}

fn transport_error(error: anyhow::Error) -> AiError {
    AiError::Transport(format!("{error:#}"))
}

#[async_trait]
impl ChatTransport for TelegramChannel {
    async fn send_text(&self, chat_id: i64, text: &str) -> vayuu_ai::Result<()> {
        self.send_message(chat_id, text)
            .await
            .map_err(transport_error)
    }

    async fn send_file(
        &self,
        chat_id: i64,
        path: &Path,
        caption: Option<&str>,
    ) -> vayuu_ai::Result<()> {
        self.send_media(chat_id, path, caption)
            .await
            .map_err(transport_error)
    }

    async fn send_typing(&self, chat_id: i64) -> vayuu_ai::Result<()> {
        self.send_chat_action(chat_id)
            .await
            .map_err(transport_error)
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    #[allow(dead_code)]
    pub id: i64,
    #[allow(dead_code)]
    pub is_bot: bool,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageResponse {
    #[allow(dead_code)]
    message_id: i64,
}
