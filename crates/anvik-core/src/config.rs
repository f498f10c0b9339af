//! Shared configuration for Anvik.
//!
//! Locates the state directory and reads the environment settings used by
//! the bot, the HTTP server and every integration.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.anvik/
//! ├── config/
//! │   └── .env.local   # Secrets (bot token, API keys)
//! ├── users/           # One JSON document per chat
//! └── reminders.json   # Pending reminders
//! ```
//!
//! # Environment Variables
//!
//! - `ANVIK_STATE_DIR`: Override the base state directory
//! - `ANVIK_STORE_DIR`: Override where user and reminder documents live

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "ANVIK_STATE_DIR";

/// Environment variable for custom store directory.
pub const STORE_DIR_ENV: &str = "ANVIK_STORE_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".anvik";

const CONFIG_SUBDIR: &str = "config";

/// Default OpenAI-compatible chat completions endpoint.
pub const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default classification model.
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4o-mini";

/// Default public base URL of the HTTP server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default SMTP relay.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Anvik state directory.
///
/// The state directory is determined by:
/// 1. `ANVIK_STATE_DIR` environment variable if set
/// 2. `~/.anvik` if home directory is available
/// 3. `.anvik` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(|p| expand_path(&p))
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Get the .env.local file path.
///
/// Environment file for secrets (bot token, API keys).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the state directory exists, creating it if necessary.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_state_dir() -> std::io::Result<()> {
    let dir = state_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(())
}

/// Loads `.env` files into the process environment.
///
/// Order: the state dir's `config/.env.local`, then `.env.local` and `.env`
/// in the working directory. Variables already set are never overwritten,
/// so the first file to define a key wins.
pub fn load_dotenv() {
    let global = env_file();
    if global.exists() {
        let _ = dotenvy::from_path(&global);
        debug!(path = %global.display(), "Loaded env file");
    }
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

/// Expands a leading `~` in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// OAuth client registration for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Language model settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

/// Outbound SMTP account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub user: String,
    pub pass: String,
}

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub telegram_token: Option<String>,
    pub base_url: String,
    pub google: Option<OAuthClient>,
    pub notion: Option<OAuthClient>,
    pub smtp: Option<SmtpSettings>,
    pub store_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub port: u16,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = get("BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let llm = LlmSettings {
            api_key: get("LLM_API_KEY")
                .or_else(|| get("OPENROUTER_API_KEY"))
                .or_else(|| get("OPENAI_API_KEY")),
            api_url: get("LLM_API_URL").unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            model: get("DEFAULT_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        let google = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id,
                client_secret,
                redirect_uri: get("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| format!("{}/auth/google/callback", base_url)),
            }),
            _ => None,
        };

        let notion = match (get("NOTION_CLIENT_ID"), get("NOTION_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id,
                client_secret,
                redirect_uri: get("NOTION_REDIRECT_URI")
                    .unwrap_or_else(|| format!("{}/auth/notion/callback", base_url)),
            }),
            _ => None,
        };

        let smtp = match (get("SMTP_USER"), get("SMTP_PASS")) {
            (Some(user), Some(pass)) => Some(SmtpSettings {
                host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                user,
                pass,
            }),
            _ => None,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let store_dir = get(STORE_DIR_ENV)
            .map(|p| expand_path(&p))
            .unwrap_or_else(state_dir);

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            llm,
            telegram_token: get("TELEGRAM_BOT_TOKEN").or_else(|| get("BOT_TOKEN")),
            base_url,
            google,
            notion,
            smtp,
            store_dir,
            allowed_origins,
            port,
        })
    }

    /// The bot token, or an error naming the variable to set.
    pub fn require_telegram_token(&self) -> ConfigResult<&str> {
        self.telegram_token
            .as_deref()
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
    }

    /// Directory holding user and reminder documents.
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(settings.llm.api_url, DEFAULT_LLM_API_URL);
        assert!(settings.llm.api_key.is_none());
        assert!(settings.google.is_none());
        assert!(settings.smtp.is_none());
        assert!(settings.allowed_origins.is_empty());
        assert!(settings.require_telegram_token().is_err());
    }

    #[test]
    fn test_api_key_fallback_order() {
        let settings =
            Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-openai")])).unwrap();
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-openai"));

        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]))
        .unwrap();
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-or"));
    }

    #[test]
    fn test_redirect_uri_derived_from_base_url() {
        let settings = Settings::from_lookup(lookup(&[
            ("BASE_URL", "https://anvik.example.com/"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        let google = settings.google.unwrap();
        assert_eq!(
            google.redirect_uri,
            "https://anvik.example.com/auth/google/callback"
        );
    }

    #[test]
    fn test_bot_token_alias_and_origins() {
        let settings = Settings::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("ALLOWED_ORIGINS", "https://a.com, https://b.com,"),
        ]))
        .unwrap();
        assert_eq!(settings.require_telegram_token().unwrap(), "123:abc");
        assert_eq!(settings.allowed_origins, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn test_invalid_port() {
        let result = Settings::from_lookup(lookup(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "PORT", .. })));
    }

    #[test]
    fn test_smtp_requires_credentials() {
        let settings = Settings::from_lookup(lookup(&[("SMTP_USER", "bot@example.com")])).unwrap();
        assert!(settings.smtp.is_none());

        let settings = Settings::from_lookup(lookup(&[
            ("SMTP_USER", "bot@example.com"),
            ("SMTP_PASS", "app-pass"),
        ]))
        .unwrap();
        assert_eq!(settings.smtp.unwrap().host, DEFAULT_SMTP_HOST);
    }

    #[test]
    fn test_env_file_under_config_dir() {
        let path = env_file();
        assert!(path.ends_with("config/.env.local"));
    }
}
