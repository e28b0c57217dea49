//! Telegram chat transport

mod chunk;
mod telegram;

pub use telegram::{IncomingMessage, TelegramChannel};
