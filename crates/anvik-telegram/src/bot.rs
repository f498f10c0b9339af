//! Telegram bot wiring.

use anvik_router::IntentRouter;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_command, handle_message, handle_unknown_command, Command};

/// The Anvik bot: a teloxide dispatcher in front of an [`IntentRouter`].
pub struct AnvikBot {
    bot: Bot,
    router: IntentRouter,
}

impl AnvikBot {
    pub fn new(bot: Bot, router: IntentRouter) -> Self {
        Self { bot, router }
    }

    /// The bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Long-polls until Ctrl+C.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let router_for_commands = self.router.clone();
        let router_for_messages = self.router.clone();

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let router = router_for_commands.clone();
                        debug!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, router).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                    .endpoint(handle_unknown_command),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some())
                    .endpoint(move |bot: Bot, msg: Message| {
                        let router = router_for_messages.clone();
                        debug!(chat_id = %msg.chat.id, "Message received");
                        async move { handle_message(bot, msg, router).await }
                    }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
