//! OAuth redirect and callback handlers.
//!
//! The chat id travels through the provider as the `state` parameter, so the
//! callback knows which user record receives the tokens.

use anvik_models::ChatId;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, info, warn};

use crate::error::{ApiError, Result};
use crate::pages;
use crate::state::AppState;
use crate::types::{AuthStartQuery, CallbackQuery};

fn required_state(query: &AuthStartQuery) -> Result<ChatId> {
    query
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ChatId::from)
        .ok_or_else(|| ApiError::BadRequest("missing state".to_string()))
}

/// GET /auth/google?state=<chat>
pub async fn google_start(
    State(state): State<AppState>,
    Query(query): Query<AuthStartQuery>,
) -> Result<Redirect> {
    let chat_id = required_state(&query)?;
    let url = state.ctx.google.auth_url(&chat_id)?;
    Ok(Redirect::temporary(&url))
}

/// GET /auth/google/callback?code&state
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(reason) = &query.error {
        warn!(reason = %reason, "Google consent declined");
        return (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::failure("Google"))).into_response();
    }

    let code = query.code.as_deref().unwrap_or_default();
    let chat = query.state.as_deref().unwrap_or_default();
    match state.ctx.google.handle_callback(code, chat).await {
        Ok(chat_id) => {
            info!(chat_id = %chat_id, "Google OAuth callback complete");
            Html(pages::google_success()).into_response()
        }
        Err(e) => {
            error!(error = %e, "Google OAuth callback failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::failure("Google"))).into_response()
        }
    }
}

/// GET /auth/notion?state=<chat>
///
/// Without a registered Notion app the user is told to paste an
/// integration token instead.
pub async fn notion_start(
    State(state): State<AppState>,
    Query(query): Query<AuthStartQuery>,
) -> Result<Response> {
    let chat_id = required_state(&query)?;
    let oauth = &state.ctx.notion_oauth;
    if !oauth.is_configured() {
        return Ok(format!(
            "To connect Notion, paste your integration token to your Telegram chat with: /notion_token <token> <database_id>. State: {}",
            chat_id
        )
        .into_response());
    }
    let url = oauth.auth_url(&chat_id)?;
    Ok(Redirect::temporary(&url).into_response())
}

/// GET /auth/notion/callback?code&state=notion:<chat>
pub async fn notion_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(reason) = &query.error {
        warn!(reason = %reason, "Notion consent declined");
        return (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::failure("Notion"))).into_response();
    }

    let code = query.code.as_deref().unwrap_or_default();
    let chat = query.state.as_deref().unwrap_or_default();
    match state.ctx.notion_oauth.handle_callback(code, chat).await {
        Ok(chat_id) => {
            info!(chat_id = %chat_id, "Notion OAuth callback complete");
            Html(pages::notion_success()).into_response()
        }
        Err(e) => {
            error!(error = %e, "Notion OAuth callback failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::failure("Notion"))).into_response()
        }
    }
}
