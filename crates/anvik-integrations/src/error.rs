//! Error types for integration adapters.

use anvik_persistence::PersistenceError;
use serde_json::Value;
use thiserror::Error;

/// Errors raised inside adapters before they are turned into reply text.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// The user has not linked the service.
    #[error("{0} is not connected")]
    NotConnected(&'static str),

    /// The server has no credentials for the service.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Input from the user or model could not be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("{service} API error {status}: {body}")]
    Provider {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Mail could not be built or delivered.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// The user or reminder store failed.
    #[error("store error: {0}")]
    Store(#[from] PersistenceError),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Returns the JSON body of a successful response, or a `Provider` error.
pub(crate) async fn json_or_error(service: &'static str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(IntegrationError::Provider {
            service,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}
