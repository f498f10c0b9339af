//! Anvik binary: Telegram bot plus the OAuth/health HTTP server.
//!
//! Start with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx LLM_API_KEY=yyy cargo run -p anvik-telegram
//! ```

use std::sync::Arc;

use anvik_api::{ApiConfig, AppState};
use anvik_core::{config, OpenRouterClassifier, Settings};
use anvik_persistence::{ReminderStore, RetryPolicy, UserStore};
use anvik_router::{AnvikContext, IntentRouter, Services};
use anvik_telegram::{AnvikBot, TelegramNotifier};
use clap::Parser;
use teloxide::Bot;
use tracing_subscriber::EnvFilter;

/// Anvik - calendar, tasks, email and reminders from Telegram
#[derive(Parser, Debug)]
#[command(name = "anvik")]
#[command(about = "Telegram assistant for Google Calendar, Notion tasks, email and reminders")]
struct Args {
    /// HTTP port for OAuth callbacks and health (defaults to PORT or 5000)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_dotenv();
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "anvik=info,teloxide=warn",
        1 => "anvik=debug,teloxide=info",
        2 => "anvik=trace,teloxide=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = config::ensure_state_dir() {
        tracing::warn!(error = %e, "Failed to create state directory");
    }

    let settings = Settings::from_env()?;
    let token = settings.require_telegram_token()?.to_string();

    let users = Arc::new(UserStore::connect(settings.store_dir(), RetryPolicy::default()).await?);
    let reminders = Arc::new(ReminderStore::new(settings.store_dir()));
    let classifier = Arc::new(OpenRouterClassifier::new(&settings.llm)?);
    tracing::info!(model = %classifier.model(), store = %settings.store_dir().display(), "Starting Anvik");

    let bot = Bot::new(token);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    let ctx = Arc::new(AnvikContext::new(Services::from_settings(
        &settings,
        users,
        reminders,
        classifier,
        notifier,
    )));

    match ctx.reminders.recover().await {
        Ok(count) => tracing::info!(count, "Pending reminders re-armed"),
        Err(e) => tracing::warn!(error = %e, "Failed to recover reminders"),
    }

    let api_config = ApiConfig::new(args.host, args.port.unwrap_or(settings.port))
        .with_cors_origins(settings.allowed_origins.clone());
    let api_state = AppState::new(api_config, Arc::clone(&ctx));
    tokio::spawn(async move {
        if let Err(e) = anvik_api::serve(api_state).await {
            tracing::error!(error = %e, "HTTP server stopped");
        }
    });

    let bot = AnvikBot::new(bot, IntentRouter::new(ctx));
    let username = bot.get_me().await?;
    tracing::info!(username = %username, "Bot initialized successfully");
    println!("\nAnvik");
    println!("   Bot: @{}", username);
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;
    Ok(())
}
