//! HTTP surface for Anvik.
//!
//! A small axum server that runs next to the chat transport:
//! - `GET /health` for liveness and store status
//! - Google and Notion OAuth redirect and callback endpoints
//!
//! # Example
//!
//! ```ignore
//! use anvik_api::{ApiConfig, AppState, serve};
//!
//! let state = AppState::new(ApiConfig::new("0.0.0.0", 5000), ctx);
//! serve(state).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve};
pub use state::AppState;
