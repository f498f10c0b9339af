//! Intent classification through an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::LlmSettings;
use crate::error::{LlmError, LlmResult};
use crate::prompt::SYSTEM_PROMPT;

/// Request timeout for the completion call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 500;

/// Turns user text into the model's raw JSON answer.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Returns the model output verbatim; parsing happens in the caller.
    async fn classify(&self, text: &str) -> LlmResult<String>;
}

/// Classifier backed by OpenRouter (or any compatible endpoint).
#[derive(Clone)]
pub struct OpenRouterClassifier {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenRouterClassifier {
    /// Create a classifier from settings.
    pub fn new(settings: &LlmSettings) -> LlmResult<Self> {
        let api_key = settings.api_key.clone().ok_or(LlmError::NoApiKey)?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
        })
    }

    /// The model identifier requests are sent with.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl IntentClassifier for OpenRouterClassifier {
    async fn classify(&self, text: &str) -> LlmResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", text),
            ],
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
            response_format: Some(ResponseFormat::json_object()),
        };

        trace!(model = %self.model, "Sending classification request");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Anvik")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        debug!(chars = content.len(), "Classification response received");
        Ok(content)
    }
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Structured output mode.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn settings(url: String) -> LlmSettings {
        LlmSettings {
            api_key: Some("test-key".into()),
            api_url: url,
            model: "openai/gpt-4o-mini".into(),
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = OpenRouterClassifier::new(&LlmSettings {
            api_key: None,
            api_url: "http://localhost".into(),
            model: "m".into(),
        });
        assert!(matches!(result, Err(LlmError::NoApiKey)));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::new("user", "hi")],
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
            response_format: Some(ResponseFormat::json_object()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["max_tokens"], 500);
    }

    #[tokio::test]
    async fn test_classify_returns_content_and_sends_prompt() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "show my tasks");
                Json(json!({
                    "choices": [{"message": {"content": "{\"intent\":\"get_tasks\"}"}}]
                }))
            }),
        );
        let url = spawn(router).await;
        let classifier = OpenRouterClassifier::new(&settings(url)).unwrap();

        let raw = classifier.classify("show my tasks").await.unwrap();
        assert_eq!(raw, "{\"intent\":\"get_tasks\"}");
    }

    #[tokio::test]
    async fn test_classify_maps_error_status() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = spawn(router).await;
        let classifier = OpenRouterClassifier::new(&settings(url)).unwrap();

        let err = classifier.classify("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_classify_empty_choices() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let url = spawn(router).await;
        let classifier = OpenRouterClassifier::new(&settings(url)).unwrap();

        let err = classifier.classify("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
