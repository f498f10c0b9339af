//! Error types for the Telegram transport and startup.

use anvik_core::{ConfigError, LlmError};
use anvik_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// A chat id that does not map to a Telegram chat.
    #[error("Not a Telegram chat id: {0}")]
    InvalidChat(String),

    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] PersistenceError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelegramError>;
