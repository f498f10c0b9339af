//! Telegram transport for Anvik.
//!
//! Every text message is handed to the [`IntentRouter`](anvik_router::IntentRouter)
//! and the reply is sent back to the same chat.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN` (or `BOT_TOKEN`): bot token from @BotFather
//! - `LLM_API_KEY` (or `OPENROUTER_API_KEY`): intent classification
//!
//! Optional:
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`: Calendar and Gmail
//! - `NOTION_CLIENT_ID`, `NOTION_CLIENT_SECRET`: Notion OAuth
//! - `SMTP_USER`, `SMTP_PASS`: OTP and outbound mail
//! - `BASE_URL`, `PORT`: public address of the HTTP server
//!
//! # Commands
//!
//! - `/start`, `/help`
//! - `/notion_token <token> [database_id]`

pub mod bot;
pub mod error;
pub mod format;
pub mod handlers;
pub mod notifier;

pub use bot::AnvikBot;
pub use error::{Result, TelegramError};
pub use notifier::TelegramNotifier;
