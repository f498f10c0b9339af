//! Router configuration and server setup.

use axum::{http::HeaderValue, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::handlers;
use crate::state::AppState;

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origin = if config.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Creates the router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new().layer(cors_layer(&state.config));

    Router::new()
        .route("/health", get(handlers::health))
        // Google
        .route("/auth/google", get(handlers::google_start))
        .route("/auth/google/callback", get(handlers::google_callback))
        // Notion
        .route("/auth/notion", get(handlers::notion_start))
        .route("/auth/notion/callback", get(handlers::notion_callback))
        .layer(middleware)
        .with_state(state)
}

/// Binds and serves until the process stops.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, create_router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anvik_core::error::LlmResult;
    use anvik_core::{IntentClassifier, OAuthClient};
    use anvik_integrations::{
        GoogleOAuth, HttpCalendarApi, HttpGmailApi, HttpNotionApi, Notifier,
    };
    use anvik_models::ChatId;
    use anvik_persistence::{ReminderStore, UserStore};
    use anvik_router::{AnvikContext, Services};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Json;
    use axum_test::TestServer;
    use serde_json::json;
    use tempfile::tempdir;

    struct Silent;

    #[async_trait]
    impl IntentClassifier for Silent {
        async fn classify(&self, _text: &str) -> LlmResult<String> {
            Ok(String::new())
        }
    }

    #[async_trait]
    impl Notifier for Silent {
        async fn notify(&self, _chat_id: &ChatId, _text: &str) -> anvik_integrations::Result<()> {
            Ok(())
        }
    }

    fn google_client() -> OAuthClient {
        OAuthClient {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            redirect_uri: "http://localhost:5000/auth/google/callback".into(),
        }
    }

    fn make_context(google: Option<OAuthClient>) -> (Arc<UserStore>, AnvikContext) {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();
        std::mem::forget(dir);

        let users = Arc::new(UserStore::open(&path).unwrap());
        let ctx = AnvikContext::new(Services {
            users: Arc::clone(&users),
            reminders: Arc::new(ReminderStore::new(&path)),
            classifier: Arc::new(Silent),
            calendar_api: Arc::new(HttpCalendarApi::new()),
            notion_api: Arc::new(HttpNotionApi::new()),
            gmail_api: Arc::new(HttpGmailApi::new()),
            mailer: None,
            notifier: Arc::new(Silent),
            google_client: google,
            notion_client: None,
            base_url: "http://localhost:5000".into(),
        });
        (users, ctx)
    }

    fn server(ctx: AnvikContext) -> TestServer {
        let state = AppState::new(ApiConfig::default(), Arc::new(ctx));
        TestServer::new(create_router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (users, ctx) = make_context(None);
        users.get_or_create(&ChatId::from("7")).await.unwrap();
        let server = server(ctx);

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap().is_empty());
        assert_eq!(body["store"]["status"], "available");
        assert_eq!(body["store"]["users"], 1);
    }

    #[tokio::test]
    async fn test_google_start_redirects_with_state() {
        let (_, ctx) = make_context(Some(google_client()));
        let server = server(ctx);

        let response = server.get("/auth/google?state=42").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        let location = response.header("location");
        let location = location.to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(location.contains("state=42"));
        assert!(location.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn test_google_start_errors() {
        let (_, ctx) = make_context(None);
        let server = server(ctx);

        let response = server.get("/auth/google").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server.get("/auth/google?state=42").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_google_callback_failure_page() {
        let (_, ctx) = make_context(None);
        let server = server(ctx);

        let response = server.get("/auth/google/callback?code=abc&state=42").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().contains("Login Failed"));

        let response = server.get("/auth/google/callback?error=access_denied").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_google_callback_stores_tokens() {
        let token_app = Router::new().route(
            "/token",
            post(|| async {
                Json(json!({
                    "access_token": "ya29.fresh",
                    "refresh_token": "1//refresh",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, token_app).await.unwrap();
        });

        let (users, mut ctx) = make_context(Some(google_client()));
        ctx.google = Arc::new(
            GoogleOAuth::new(Some(google_client()), Arc::clone(&users))
                .with_token_url(format!("http://{}/token", addr)),
        );
        let server = server(ctx);

        let response = server.get("/auth/google/callback?code=abc&state=42").await;
        response.assert_status_ok();
        assert!(response.text().contains("Login Successful!"));

        let user = users.get(&ChatId::from("42")).await.unwrap();
        let google = user.google.unwrap();
        assert_eq!(google.access_token, "ya29.fresh");
        assert_eq!(google.refresh_token.as_deref(), Some("1//refresh"));
        assert!(google.expiry_date.is_some());
    }

    #[tokio::test]
    async fn test_notion_start_without_app_shows_paste_instructions() {
        let (_, ctx) = make_context(None);
        let server = server(ctx);

        let response = server.get("/auth/notion?state=42").await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("/notion_token <token> <database_id>"));
        assert!(text.ends_with("State: 42"));
    }

    #[tokio::test]
    async fn test_notion_callback_rejects_bad_state() {
        let (_, ctx) = make_context(None);
        let server = server(ctx);

        let response = server.get("/auth/notion/callback?code=abc&state=42").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().contains("connecting your Notion account"));
    }
}
