//! Request and response DTOs.

use serde::{Deserialize, Serialize};

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store is unavailable.
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    pub status: String,
    pub users: usize,
}

/// Query of `/auth/google` and `/auth/notion`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthStartQuery {
    pub state: Option<String>,
}

/// Query the OAuth providers send back to the callbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the user declined consent.
    pub error: Option<String>,
}
