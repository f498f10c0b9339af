//! Error types for configuration and the LLM client.

use thiserror::Error;

/// Errors raised while reading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Errors from the intent classification call.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key was configured.
    #[error("LLM API key not set")]
    NoApiKey,

    /// Transport-level failure.
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The completion carried no message content.
    #[error("LLM response had no content")]
    EmptyResponse,
}

/// Result alias for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for LLM calls.
pub type LlmResult<T> = std::result::Result<T, LlmError>;
