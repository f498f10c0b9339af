//! Pushes reminder text to Telegram chats.

use anvik_integrations::{IntegrationError, Notifier};
use anvik_models::ChatId;
use async_trait::async_trait;
use teloxide::Bot;

use crate::handlers::send_reply;

/// [`Notifier`] that sends through the bot.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Telegram chat for a stored chat id.
pub fn telegram_chat(chat_id: &ChatId) -> Option<teloxide::types::ChatId> {
    chat_id.as_i64().map(teloxide::types::ChatId)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, chat_id: &ChatId, text: &str) -> anvik_integrations::Result<()> {
        let chat = telegram_chat(chat_id).ok_or_else(|| {
            IntegrationError::InvalidInput(format!("not a Telegram chat id: {}", chat_id))
        })?;
        send_reply(&self.bot, chat, text)
            .await
            .map_err(|e| IntegrationError::Provider {
                service: "Telegram",
                status: 0,
                body: e.to_string(),
            })
    }
}
