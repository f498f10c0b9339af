//! Health check handler.

use axum::{extract::State, Json};

use crate::state::AppState;
use crate::types::{HealthResponse, StoreHealth};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let users = &state.ctx.users;
    let available = users.is_available();

    Json(HealthResponse {
        status: if available { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.uptime_seconds(),
        store: StoreHealth {
            status: if available { "available" } else { "unavailable" }.to_string(),
            users: users.count().await,
        },
    })
}
