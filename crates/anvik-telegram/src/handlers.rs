//! Command and message handlers for the bot.

use std::panic::AssertUnwindSafe;

use anvik_router::IntentRouter;
use futures::FutureExt;
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::format::{contains_url, to_markdown_v2};

/// Sent when routing a message blew up.
pub const INTERNAL_ERROR: &str = "⚠️ Internal error. Try again later.";

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Connect Notion with an integration token: /notion_token <token> [database_id]")]
    NotionToken(String),
}

fn welcome_text() -> String {
    format!(
        "👋 Hi, I'm Anvik, your assistant for calendar, tasks, email and reminders.\n\n\
        Try:\n\
        • meeting with Ravi tomorrow at 3pm\n\
        • add task finish report by Friday\n\
        • show my tasks\n\
        • remind me to call mom at 8pm\n\n\
        Connect your accounts with \"connect google\" and \"connect notion\".\n\n{}",
        Command::descriptions()
    )
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Sends `text` to `chat`.
///
/// Replies carrying a link go out as plain text without a preview. Others
/// are sent as MarkdownV2, falling back to plain text if Telegram rejects
/// the markup.
pub async fn send_reply(bot: &Bot, chat: ChatId, text: &str) -> ResponseResult<()> {
    if contains_url(text) {
        bot.send_message(chat, text)
            .link_preview_options(no_preview())
            .await?;
        return Ok(());
    }

    let sent = bot
        .send_message(chat, to_markdown_v2(text))
        .parse_mode(ParseMode::MarkdownV2)
        .await;
    if let Err(e) = sent {
        warn!(chat_id = %chat, error = %e, "MarkdownV2 reply rejected, resending as plain text");
        bot.send_message(chat, text).await?;
    }
    Ok(())
}

/// Handle a parsed bot command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    router: IntentRouter,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
            // Registers the user on first contact
            if let Err(e) = router
                .context()
                .users
                .get_or_create(&anvik_models::ChatId::from(msg.chat.id.0))
                .await
            {
                error!(chat_id = %msg.chat.id, error = %e, "Failed to register user");
            }
            bot.send_message(msg.chat.id, welcome_text()).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, welcome_text()).await?;
        }
        Command::NotionToken(args) => {
            // Arguments arrive already split from `/notion_token[@bot]`
            let chat = anvik_models::ChatId::from(msg.chat.id.0);
            let reply = router.store_notion_token(&chat, &args).await;
            send_reply(&bot, msg.chat.id, &reply).await?;
        }
    }
    Ok(())
}

/// Reply for a `/command` that did not parse.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        let name = text.split_whitespace().next().unwrap_or(text);
        info!(chat_id = %msg.chat.id, cmd = %name, "Unknown command");
        bot.send_message(
            msg.chat.id,
            format!("Unknown command: {}\n\nUse /help to see available commands.", name),
        )
        .await?;
    }
    Ok(())
}

/// Route a text message and send the reply.
pub async fn handle_message(bot: Bot, msg: Message, router: IntentRouter) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat = anvik_models::ChatId::from(msg.chat.id.0);
    let name = msg.from.as_ref().map(|u| u.full_name());

    let routed = AssertUnwindSafe(router.route_named(text, &chat, name.as_deref()))
        .catch_unwind()
        .await;
    let reply = match routed {
        Ok(reply) => reply,
        Err(_) => {
            error!(chat_id = %chat, "Routing panicked");
            INTERNAL_ERROR.to_string()
        }
    };

    send_reply(&bot, msg.chat.id, &reply).await
}
