//! Message routing.
//!
//! Fixed commands are matched first and never reach the model. Everything
//! else is classified by the LLM and dispatched to one adapter.

use std::sync::Arc;

use anvik_core::datetime::parse_timezone;
use anvik_core::intent::{classifier_input, parse_intent};
use anvik_integrations::notion::updates_from_details;
use anvik_integrations::DEFAULT_EVENT_LIMIT;
use anvik_models::{ChatId, Intent, IntentResult, User};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::context::AnvikContext;

pub const EMPTY_MESSAGE: &str = "⚠️ Empty message received. Send a valid command.";
pub const INTERNAL_ERROR: &str = "⚠️ Internal error. Try again later.";
pub const NOT_UNDERSTOOD: &str = "Sorry, I didn't understand that.";
pub const CLASSIFIER_FAILED: &str = "Sorry, I had an issue understanding that.";
pub const FALLBACK_REPLY: &str = "🤖 I didn't understand. Try: add task..., schedule..., set reminder...";

/// Subject used for `send email`.
pub const OUTBOUND_SUBJECT: &str = "Message from Anvik";

/// Inbox size listed by `my emails`.
const RECENT_EMAILS: u32 = 5;

const PAGE_ID_KEYS: &[&str] = &["pageId", "page_id", "taskId", "task_id", "id"];

/// Returns what follows `prefix` when `text` starts with it as a whole word,
/// ignoring ASCII case. Slash commands may carry a `@botname` suffix, as
/// Telegram sends them in group chats.
fn strip_command<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let mut rest = &text[prefix.len()..];
    if prefix.starts_with('/') {
        if let Some(mention) = rest.strip_prefix('@') {
            let end = mention.find(char::is_whitespace).unwrap_or(mention.len());
            rest = &mention[end..];
        }
    }
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Turns chat text into reply text.
#[derive(Clone)]
pub struct IntentRouter {
    ctx: Arc<AnvikContext>,
}

impl IntentRouter {
    pub fn new(ctx: Arc<AnvikContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<AnvikContext> {
        &self.ctx
    }

    pub async fn route(&self, text: &str, chat_id: &ChatId) -> String {
        self.route_named(text, chat_id, None).await
    }

    /// Like [`route`](Self::route); `name` is recorded when the user is
    /// first seen.
    pub async fn route_named(&self, text: &str, chat_id: &ChatId, name: Option<&str>) -> String {
        let text = text.trim();
        if text.is_empty() {
            return EMPTY_MESSAGE.to_string();
        }

        let user = match self.ctx.users.get_or_create(chat_id).await {
            Ok((user, created)) => {
                if created {
                    info!(chat_id = %chat_id, "New user");
                    self.record_name(chat_id, name).await;
                }
                user
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "User lookup failed");
                return INTERNAL_ERROR.to_string();
            }
        };

        if let Some(reply) = self.try_command(text, chat_id).await {
            return reply;
        }

        let input = classifier_input(text);
        let raw = match self.ctx.classifier.classify(&input).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Intent classification failed");
                return CLASSIFIER_FAILED.to_string();
            }
        };

        let result = parse_intent(&raw).unwrap_or_else(|| {
            warn!(chat_id = %chat_id, "No JSON object in classifier output");
            IntentResult::general(NOT_UNDERSTOOD)
        });
        debug!(chat_id = %chat_id, intent = result.intent.as_str(), "Dispatching");

        self.dispatch(result, &user).await
    }

    async fn record_name(&self, chat_id: &ChatId, name: Option<&str>) {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return;
        };
        let name = name.to_string();
        if let Err(e) = self.ctx.users.update(chat_id, |u| u.name = Some(name)).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to store display name");
        }
    }

    async fn try_command(&self, text: &str, chat_id: &ChatId) -> Option<String> {
        let ctx = &self.ctx;

        if let Some(address) = strip_command(text, "login email") {
            if address.is_empty() {
                return Some("Usage: login email <your email>".to_string());
            }
            return Some(ctx.email.send_login_otp(chat_id, address).await);
        }

        if let Some(code) = strip_command(text, "verify otp") {
            if code.is_empty() {
                return Some("Usage: verify otp <code>".to_string());
            }
            return Some(ctx.email.verify_login_otp(chat_id, code).await);
        }

        if let Some(rest) = strip_command(text, "send email") {
            let (to, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let body = body.trim();
            if to.is_empty() || body.is_empty() {
                return Some("Usage: send email <address> <message>".to_string());
            }
            return Some(ctx.email.send_user_email(chat_id, to, OUTBOUND_SUBJECT, body).await);
        }

        if strip_command(text, "my emails").is_some() {
            return Some(ctx.email.get_recent_emails(chat_id, RECENT_EMAILS).await);
        }

        if strip_command(text, "connect notion").is_some() {
            return Some(format!(
                "🔗 Connect Notion: {}\nOr send your Notion integration token with: `/notion_token YOUR_TOKEN`",
                ctx.notion_connect_url(chat_id)
            ));
        }

        if strip_command(text, "connect google").is_some() {
            return Some(match ctx.google.auth_url(chat_id) {
                Ok(url) => format!("🔗 Authorize Google Calendar: {}", url),
                Err(e) => {
                    warn!(error = %e, "Google consent URL unavailable");
                    "⚠️ Google Calendar is not configured on this server.".to_string()
                }
            });
        }

        if let Some(args) = strip_command(text, "/notion_token") {
            return Some(self.store_notion_token(chat_id, args).await);
        }

        None
    }

    /// Stores `<integration_token> [database_id]` from the `/notion_token`
    /// arguments. Never goes through the classifier.
    pub async fn store_notion_token(&self, chat_id: &ChatId, args: &str) -> String {
        let mut parts = args.split_whitespace();
        let Some(token) = parts.next() else {
            return "Usage: /notion_token <integration_token> [database_id]".to_string();
        };
        let token = token.to_string();
        let database_id = parts.next().map(String::from);
        let has_database = database_id.is_some();

        let stored = self
            .ctx
            .users
            .update(chat_id, |u| {
                u.notion_token = Some(token);
                if database_id.is_some() {
                    u.notion_database_id = database_id;
                }
            })
            .await;

        match stored {
            Ok(()) if has_database => {
                info!(chat_id = %chat_id, "Notion token and database stored");
                "✅ Notion connected! Tasks will be added to your database.".to_string()
            }
            Ok(()) => {
                info!(chat_id = %chat_id, "Notion token stored");
                "✅ Notion connected! The database will be created automatically when you add your first task."
                    .to_string()
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Failed to store Notion token");
                INTERNAL_ERROR.to_string()
            }
        }
    }

    async fn dispatch(&self, result: IntentResult, user: &User) -> String {
        let ctx = &self.ctx;
        let chat_id = &user.chat_id;

        match result.intent {
            Intent::CreateEvent | Intent::GetEvents if user.google.is_none() => {
                ctx.calendar.connect_instruction(chat_id)
            }
            Intent::CreateEvent => ctx.calendar.create_event(&result.details, chat_id).await,
            Intent::GetEvents => {
                let limit = result
                    .details
                    .get("limit")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_EVENT_LIMIT);
                ctx.calendar.list_events(chat_id, limit).await
            }
            Intent::AddTask => {
                ctx.notion
                    .create_task(
                        chat_id,
                        result.detail_str("title"),
                        result.detail_str("description"),
                        result.detail_any(&["due_date", "dueDate", "date"]),
                    )
                    .await
            }
            Intent::GetTasks => ctx.notion.list_tasks(chat_id).await,
            Intent::UpdateTask => {
                let today = Utc::now()
                    .with_timezone(&parse_timezone(&user.prefs.timezone))
                    .date_naive();
                let updates = match result.detail_object("updates") {
                    Some(map) => updates_from_details(map, today),
                    None => updates_from_details(&result.details, today),
                };
                ctx.notion
                    .update_task(chat_id, result.detail_any(PAGE_ID_KEYS), &updates)
                    .await
            }
            Intent::DeleteTask => {
                ctx.notion
                    .delete_task(chat_id, result.detail_any(PAGE_ID_KEYS))
                    .await
            }
            Intent::SetReminder => ctx.reminders.schedule(&result.details, chat_id).await,
            Intent::General => general_reply(&result),
        }
    }
}

fn general_reply(result: &IntentResult) -> String {
    if let Some(reply) = result.detail_str("reply") {
        return reply.to_string();
    }
    let top = result.reply.trim();
    if !top.is_empty() {
        return top.to_string();
    }
    FALLBACK_REPLY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_command() {
        assert_eq!(strip_command("Login Email a@b.co", "login email"), Some("a@b.co"));
        assert_eq!(strip_command("my emails", "my emails"), Some(""));
        assert_eq!(strip_command("my emailsx", "my emails"), None);
        assert_eq!(strip_command("my", "my emails"), None);
        assert_eq!(strip_command("connect notion please", "connect notion"), Some("please"));
        assert_eq!(strip_command("émoji text", "login email"), None);
    }

    #[test]
    fn test_strip_command_with_bot_mention() {
        assert_eq!(
            strip_command("/notion_token@anvik_bot secret_abc db1", "/notion_token"),
            Some("secret_abc db1")
        );
        assert_eq!(strip_command("/notion_token@anvik_bot", "/notion_token"), Some(""));
        assert_eq!(strip_command("/notion_tokens x", "/notion_token"), None);
        assert_eq!(strip_command("my emails@x", "my emails"), None);
    }

    fn result(details: serde_json::Value, reply: &str) -> IntentResult {
        IntentResult {
            intent: Intent::General,
            details: details.as_object().cloned().unwrap(),
            reply: reply.to_string(),
        }
    }

    #[test]
    fn test_general_reply_precedence() {
        assert_eq!(general_reply(&result(json!({"reply": "hi"}), "top")), "hi");
        assert_eq!(general_reply(&result(json!({"reply": 3}), "top")), "top");
        assert_eq!(general_reply(&result(json!({}), "  ")), FALLBACK_REPLY);
    }
}
