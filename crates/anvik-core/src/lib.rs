//! Core services for Anvik.
//!
//! - [`config`]: state directory, `.env` loading and [`Settings`]
//! - [`llm`]: the [`IntentClassifier`] seam and its OpenRouter client
//! - [`intent`]: turning raw model output into an `IntentResult`
//! - [`datetime`]: natural-language dates and clock times in a user's zone

pub mod config;
pub mod datetime;
pub mod error;
pub mod intent;
pub mod llm;
pub mod prompt;

pub use config::{LlmSettings, OAuthClient, Settings, SmtpSettings};
pub use error::{ConfigError, LlmError};
pub use llm::{IntentClassifier, OpenRouterClassifier};
