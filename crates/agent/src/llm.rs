use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use storechat_core::config::{LlmConfig, LlmProvider};
use storechat_core::errors::{UpstreamError, UpstreamService};
use storechat_orders::http::{build_client, transport_error};
use tracing::debug;

const SERVICE: UpstreamService = UpstreamService::Completion;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Single-turn text generation: one instruction block, one user message.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, user_message: &str, instructions: &str)
        -> Result<String, UpstreamError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Builds the provider named in `config`, sharing one HTTP client with the configured timeout.
pub fn completion_client_from_config(
    config: &LlmConfig,
) -> Result<Arc<dyn CompletionClient>, reqwest::Error> {
    let client = build_client(Duration::from_secs(config.timeout_secs))?;
    let settings = GenerationSettings::from_config(config);
    let base_url = config.resolved_base_url().to_string();

    let completion: Arc<dyn CompletionClient> = match config.provider {
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(
            client,
            base_url,
            config.api_key.clone().unwrap_or_else(|| SecretString::from(String::new())),
            settings,
        )),
        LlmProvider::OpenAi => {
            Arc::new(OpenAiClient::new(client, base_url, config.api_key.clone(), settings))
        }
    };
    Ok(completion)
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ChatTurn<'a>; 1],
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    settings: GenerationSettings,
}

impl AnthropicClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: SecretString,
        settings: GenerationSettings,
    ) -> Self {
        let endpoint = format!("{}/v1/messages", base_url.into().trim_end_matches('/'));
        Self { client, endpoint, api_key, settings }
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(
        &self,
        user_message: &str,
        instructions: &str,
    ) -> Result<String, UpstreamError> {
        let body = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: instructions,
            messages: [ChatTurn { role: "user", content: user_message }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(SERVICE, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(SERVICE, status.as_u16()));
        }

        let payload: AnthropicResponse =
            response.json().await.map_err(|error| transport_error(SERVICE, &error))?;
        let text = payload
            .content
            .into_iter()
            .find(|block| block.kind == "text" || block.kind.is_empty())
            .and_then(|block| block.text);
        non_empty(text, "anthropic")
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [ChatTurn<'a>; 2],
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Any server speaking the chat-completions protocol. The key is optional for local gateways.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    settings: GenerationSettings,
}

impl OpenAiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        settings: GenerationSettings,
    ) -> Self {
        let endpoint = format!("{}/v1/chat/completions", base_url.into().trim_end_matches('/'));
        Self { client, endpoint, api_key, settings }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        user_message: &str,
        instructions: &str,
    ) -> Result<String, UpstreamError> {
        let body = OpenAiRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: [
                ChatTurn { role: "system", content: instructions },
                ChatTurn { role: "user", content: user_message },
            ],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response = request.send().await.map_err(|error| transport_error(SERVICE, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(SERVICE, status.as_u16()));
        }

        let payload: OpenAiResponse =
            response.json().await.map_err(|error| transport_error(SERVICE, &error))?;
        let text = payload.choices.into_iter().next().and_then(|choice| choice.message.content);
        non_empty(text, "openai")
    }
}

fn non_empty(text: Option<String>, provider: &'static str) -> Result<String, UpstreamError> {
    match text.map(|text| text.trim().to_string()) {
        Some(text) if !text.is_empty() => {
            debug!(
                event_name = "agent.completion.generated",
                provider,
                chars = text.chars().count(),
                "completion text received"
            );
            Ok(text)
        }
        _ => Err(UpstreamError::decode(SERVICE, format!("{provider} response contained no text"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use storechat_core::errors::{UpstreamErrorKind, UpstreamService};
    use storechat_orders::http::build_client;

    use super::{
        AnthropicClient, CompletionClient, GenerationSettings, OpenAiClient, ANTHROPIC_VERSION,
    };

    type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    async fn spawn(router: Router) -> String {
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake provider");
        let address = listener.local_addr().expect("fake provider address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 400,
            temperature: 0.3,
        }
    }

    fn capture(captured: &Captured, reply: Value) -> Router {
        let captured = captured.clone();
        let handler = move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            let reply = reply.clone();
            async move {
                captured.lock().expect("capture lock").push((headers, body));
                Json(reply)
            }
        };
        Router::new()
            .route("/v1/messages", post(handler.clone()))
            .route("/v1/chat/completions", post(handler))
    }

    #[tokio::test]
    async fn anthropic_sends_single_turn_with_system_block() {
        let captured = Captured::default();
        let base_url = spawn(capture(
            &captured,
            json!({ "content": [{ "type": "text", "text": "  أهلاً بك  " }] }),
        ))
        .await;
        let client = AnthropicClient::new(
            build_client(Duration::from_secs(5)).expect("http client"),
            base_url,
            SecretString::from("sk-test".to_string()),
            settings(),
        );

        let reply = client.complete("كم سعر الخدمة؟", "instructions").await;
        assert_eq!(reply, Ok("أهلاً بك".to_string()));

        let requests = captured.lock().expect("capture lock");
        let (headers, body) = &requests[0];
        assert_eq!(headers.get("x-api-key").and_then(|v| v.to_str().ok()), Some("sk-test"));
        assert_eq!(
            headers.get("anthropic-version").and_then(|v| v.to_str().ok()),
            Some(ANTHROPIC_VERSION)
        );
        assert_eq!(body["system"], "instructions");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "كم سعر الخدمة؟");
    }

    #[tokio::test]
    async fn openai_sends_system_then_user_with_bearer_key() {
        let captured = Captured::default();
        let base_url = spawn(capture(
            &captured,
            json!({ "choices": [{ "message": { "role": "assistant", "content": "Hello" } }] }),
        ))
        .await;
        let client = OpenAiClient::new(
            build_client(Duration::from_secs(5)).expect("http client"),
            format!("{base_url}/"),
            Some(SecretString::from("sk-openai".to_string())),
            settings(),
        );

        assert_eq!(client.complete("hi", "be brief").await, Ok("Hello".to_string()));

        let requests = captured.lock().expect("capture lock");
        let (headers, body) = &requests[0];
        assert_eq!(
            headers.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer sk-openai")
        );
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn empty_generation_is_a_decode_failure() {
        let captured = Captured::default();
        let base_url = spawn(capture(&captured, json!({ "content": [] }))).await;
        let client = AnthropicClient::new(
            build_client(Duration::from_secs(5)).expect("http client"),
            base_url,
            SecretString::from("sk-test".to_string()),
            settings(),
        );

        let error = client.complete("hi", "rules").await.expect_err("no text block");
        assert_eq!(error.service, UpstreamService::Completion);
        assert!(matches!(error.kind, UpstreamErrorKind::Decode(_)));
    }

    #[tokio::test]
    async fn provider_error_status_is_reported() {
        let base_url = spawn(
            Router::new().route("/v1/messages", post(|| async { StatusCode::TOO_MANY_REQUESTS })),
        )
        .await;
        let client = AnthropicClient::new(
            build_client(Duration::from_secs(5)).expect("http client"),
            base_url,
            SecretString::from("sk-test".to_string()),
            settings(),
        );

        let error = client.complete("hi", "rules").await.expect_err("429 should fail");
        assert_eq!(error.kind, UpstreamErrorKind::Status(429));
    }
}
