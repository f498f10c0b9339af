//! Application state shared across handlers.

use std::sync::Arc;

use anvik_router::AnvikContext;

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    /// The same context the chat router uses.
    pub ctx: Arc<AnvikContext>,
}

impl AppState {
    pub fn new(config: ApiConfig, ctx: Arc<AnvikContext>) -> Self {
        Self {
            config: Arc::new(config),
            ctx,
        }
    }
}
