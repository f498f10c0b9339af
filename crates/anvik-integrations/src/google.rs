//! Google OAuth2: consent URL, code exchange and token refresh.

use std::sync::Arc;

use anvik_core::OAuthClient;
use anvik_models::{ChatId, GoogleTokens, User};
use anvik_persistence::UserStore;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{json_or_error, IntegrationError, Result};

/// Google consent screen.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested at consent time.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
    /// Lifetime in seconds.
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_tokens(self, now_ms: i64, previous_refresh: Option<String>) -> GoogleTokens {
        GoogleTokens {
            access_token: self.access_token,
            // Refresh responses omit the refresh token
            refresh_token: self.refresh_token.or(previous_refresh),
            scope: self.scope,
            token_type: self.token_type,
            expiry_date: self.expires_in.map(|secs| now_ms + secs * 1000),
        }
    }
}

/// Google OAuth client bound to the user store.
pub struct GoogleOAuth {
    client: Option<OAuthClient>,
    http: reqwest::Client,
    token_url: String,
    users: Arc<UserStore>,
}

impl GoogleOAuth {
    /// `client` is `None` when no Google app is registered.
    pub fn new(client: Option<OAuthClient>, users: Arc<UserStore>) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            users,
        }
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn registration(&self) -> Result<&OAuthClient> {
        self.client
            .as_ref()
            .ok_or(IntegrationError::NotConfigured("Google"))
    }

    /// Consent URL carrying `chat_id` as `state`.
    pub fn auth_url(&self, chat_id: &ChatId) -> Result<String> {
        let reg = self.registration()?;
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", reg.client_id.as_str()),
                ("redirect_uri", reg.redirect_uri.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("scope", scope.as_str()),
                ("state", chat_id.as_str()),
            ],
        )
        .map_err(|e| IntegrationError::InvalidInput(e.to_string()))?;
        Ok(url.into())
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.http.post(&self.token_url).form(form).send().await?;
        let json = json_or_error("Google OAuth", response).await?;
        serde_json::from_value(json).map_err(|e| IntegrationError::Provider {
            service: "Google OAuth",
            status: 200,
            body: e.to_string(),
        })
    }

    /// Exchanges an authorization code and stores the tokens on the user
    /// named by `state`.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<ChatId> {
        let reg = self.registration()?;
        if code.trim().is_empty() || state.trim().is_empty() {
            return Err(IntegrationError::InvalidInput(
                "missing code or state".to_string(),
            ));
        }
        let chat_id = ChatId::from(state.trim());

        let token = self
            .request_token(&[
                ("code", code),
                ("client_id", reg.client_id.as_str()),
                ("client_secret", reg.client_secret.as_str()),
                ("redirect_uri", reg.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let now_ms = Utc::now().timestamp_millis();
        self.users
            .update(&chat_id, |user| {
                let previous = user.google.as_ref().and_then(|g| g.refresh_token.clone());
                user.google = Some(token.into_tokens(now_ms, previous));
            })
            .await?;

        info!(chat_id = %chat_id, "Google account connected");
        Ok(chat_id)
    }

    /// A usable access token for `user`, refreshed and persisted if expired.
    pub async fn access_token(&self, user: &User) -> Result<String> {
        let tokens = user
            .google
            .as_ref()
            .filter(|t| !t.access_token.is_empty())
            .ok_or(IntegrationError::NotConnected("Google"))?;

        let now_ms = Utc::now().timestamp_millis();
        if !tokens.is_expired(now_ms) {
            return Ok(tokens.access_token.clone());
        }

        let refresh = tokens
            .refresh_token
            .clone()
            .ok_or(IntegrationError::NotConnected("Google"))?;
        let reg = self.registration()?;

        debug!(chat_id = %user.chat_id, "Refreshing Google access token");
        let token = self
            .request_token(&[
                ("client_id", reg.client_id.as_str()),
                ("client_secret", reg.client_secret.as_str()),
                ("refresh_token", refresh.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        let refreshed = token.into_tokens(now_ms, Some(refresh));
        let access = refreshed.access_token.clone();
        self.users
            .update(&user.chat_id, |u| u.google = Some(refreshed))
            .await?;
        Ok(access)
    }
}
