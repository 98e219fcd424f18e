//! Model capability abstraction and the degrade-gracefully client.
//!
//! Defines the [`ChatModel`] trait and two HTTP backends:
//! - **[`OllamaChat`]**: a local Ollama instance's `POST /api/chat`.
//! - **[`OpenAiChat`]**: any OpenAI-compatible `POST /v1/chat/completions`
//!   (OpenAI itself, llama.cpp server, vLLM, ...).
//!
//! [`ModelClient`] wraps exactly one backend, bounds every call with a
//! timeout, and turns failures into a fixed fallback reply so a model outage
//! never ends the session.
//!
//! # Retry Strategy
//!
//! Both backends retry transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ModelConfig;
use crate::errors::ModelError;
use crate::models::Message;

/// A language model that answers a message sequence with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier sent to the backend (e.g. `"qwen2.5:0.5b"`).
    fn model_id(&self) -> &str;

    /// Run one completion.
    async fn chat(&self, messages: &[Message]) -> Result<String, ModelError>;

    /// Verify the backend is reachable. Called once at startup.
    async fn health_check(&self) -> Result<(), ModelError>;
}

/// Build the backend named by `model.provider`.
///
/// # Errors
///
/// Unknown provider, or (for `openai`) the API key variable is unset.
pub fn create_chat_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ModelError> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiChat::new(config)?)),
        other => Err(ModelError::UnknownProvider(other.to_string())),
    }
}

// ============ Shared HTTP plumbing ============

/// HTTP client whose every request, the startup probe included, is bounded
/// by `model.timeout_secs`.
fn http_client(config: &ModelConfig) -> Result<reqwest::Client, ModelError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// POST `body` to `url`, retrying transient failures.
async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    max_retries: u32,
) -> Result<Value, ModelError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(key) = bearer {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json::<Value>().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = ModelError::Status {
                    status: status.as_u16(),
                    body: body_text,
                };

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::debug!(attempt, %status, "model request failed, retrying");
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "model request failed, retrying");
                last_err = Some(ModelError::Request(e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ModelError::InvalidResponse("no attempts made".to_string())))
}

/// Pull a non-empty string out of `json` at `pointer`.
fn reply_at(json: &Value, pointer: &str) -> Result<String, ModelError> {
    let content = json
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::InvalidResponse(format!("missing {}", pointer)))?;

    if content.trim().is_empty() {
        return Err(ModelError::EmptyReply);
    }
    Ok(content.to_string())
}

async fn probe(client: &reqwest::Client, base_url: &str, url: &str) -> Result<Value, ModelError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ModelError::Unavailable {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ModelError::Unavailable {
            url: base_url.to_string(),
            message: format!("HTTP {}", status),
        });
    }
    Ok(response.json::<Value>().await.unwrap_or(Value::Null))
}

// ============ Ollama ============

/// Chat backend using a local Ollama instance.
///
/// Requires Ollama to be running with the model pulled
/// (e.g. `ollama pull qwen2.5:0.5b`).
pub struct OllamaChat {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        Ok(Self {
            client: http_client(config)?,
            model: config.model.clone(),
            url: config.base_url(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ModelError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        let json = post_with_retry(
            &self.client,
            &format!("{}/api/chat", self.url),
            None,
            &body,
            self.max_retries,
        )
        .await?;
        reply_at(&json, "/message/content")
    }

    async fn health_check(&self) -> Result<(), ModelError> {
        let tags = probe(&self.client, &self.url, &format!("{}/api/tags", self.url)).await?;

        let pulled = tags
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models.iter().any(|m| {
                    m.get("name").and_then(Value::as_str).is_some_and(|name| {
                        name == self.model || name == format!("{}:latest", self.model)
                    })
                })
            })
            .unwrap_or(false);

        if !pulled {
            tracing::warn!(
                model = %self.model,
                url = %self.url,
                "model not listed by Ollama; requests may fail until it is pulled"
            );
        }
        Ok(())
    }
}

// ============ OpenAI-compatible ============

/// Chat backend for OpenAI-compatible servers.
///
/// Reads the bearer key from the environment variable named by
/// `model.api_key_env`.
pub struct OpenAiChat {
    client: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAiChat {
    /// # Errors
    ///
    /// Returns [`ModelError::MissingApiKey`] if the key variable is unset.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| ModelError::MissingApiKey(config.api_key_env.clone()))?;

        Ok(Self {
            client: http_client(config)?,
            model: config.model.clone(),
            url: config.base_url(),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ModelError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        let json = post_with_retry(
            &self.client,
            &format!("{}/v1/chat/completions", self.url),
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;
        reply_at(&json, "/choices/0/message/content")
    }

    async fn health_check(&self) -> Result<(), ModelError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Unavailable {
                url: self.url.clone(),
                message: format!("HTTP {}", status),
            });
        }
        Ok(())
    }
}

// ============ Client ============

/// Wraps one [`ChatModel`] with a timeout and a fallback reply.
pub struct ModelClient {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
    fallback_reply: String,
}

impl ModelClient {
    pub fn new(model: Arc<dyn ChatModel>, config: &ModelConfig) -> Self {
        Self {
            model,
            timeout: Duration::from_secs(config.timeout_secs),
            fallback_reply: config.fallback_reply.clone(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    /// Run one completion bounded by the configured timeout.
    pub async fn try_complete(&self, messages: &[Message]) -> Result<String, ModelError> {
        match tokio::time::timeout(self.timeout, self.model.chat(messages)).await {
            Ok(Ok(reply)) if reply.trim().is_empty() => Err(ModelError::EmptyReply),
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Like [`try_complete`](Self::try_complete), but never fails: errors
    /// are logged and the fallback reply is returned instead.
    pub async fn complete(&self, messages: &[Message]) -> String {
        match self.try_complete(messages).await {
            Ok(reply) => {
                tracing::info!(
                    model = self.model_id(),
                    reply_chars = reply.chars().count(),
                    "completion finished"
                );
                reply
            }
            Err(e) => {
                tracing::warn!(model = self.model_id(), error = %e, "completion failed");
                self.fallback_reply.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ollama_config(url: &str) -> ModelConfig {
        ModelConfig {
            url: Some(url.to_string()),
            max_retries: 0,
            ..ModelConfig::default()
        }
    }

    #[tokio::test]
    async fn ollama_chat_sends_messages_and_reads_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen2.5:0.5b",
                "stream": false,
                "messages": [{"role": "user", "content": "hi"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "hello there"},
                "done": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = OllamaChat::new(&ollama_config(&server.uri())).unwrap();
        let reply = model.chat(&[Message::user("hi")]).await.unwrap();
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn ollama_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .expect(1)
            .mount(&server)
            .await;

        let config = ModelConfig {
            max_retries: 3,
            ..ollama_config(&server.uri())
        };
        let err = OllamaChat::new(&config)
            .unwrap()
            .chat(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn ollama_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "recovered"},
            })))
            .mount(&server)
            .await;

        let config = ModelConfig {
            max_retries: 1,
            ..ollama_config(&server.uri())
        };
        let reply = OllamaChat::new(&config)
            .unwrap()
            .chat(&[Message::user("hi")])
            .await
            .unwrap();
        assert_eq!(reply, "recovered");
    }

    #[tokio::test]
    async fn ollama_health_check_accepts_reachable_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "qwen2.5:0.5b"}],
            })))
            .mount(&server)
            .await;

        OllamaChat::new(&ollama_config(&server.uri()))
            .unwrap()
            .health_check()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ollama_health_check_fails_when_unreachable() {
        // Nothing listens on port 9 (discard) in the test environment.
        let model = OllamaChat::new(&ollama_config("http://127.0.0.1:9")).unwrap();
        let err = model.health_check().await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn ollama_health_check_gives_up_on_silent_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"models": []}))
                    .set_delay(Duration::from_secs(600)),
            )
            .mount(&server)
            .await;

        let config = ModelConfig {
            timeout_secs: 1,
            ..ollama_config(&server.uri())
        };
        let model = OllamaChat::new(&config).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(10), model.health_check()).await;

        let err = result.expect("health check must not outlive the model timeout");
        assert!(matches!(err, Err(ModelError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn openai_chat_uses_bearer_and_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "from openai"}}],
            })))
            .mount(&server)
            .await;

        let model = OpenAiChat {
            client: reqwest::Client::new(),
            model: "gpt-4o-mini".to_string(),
            url: server.uri(),
            api_key: "sk-test".to_string(),
            max_retries: 0,
        };
        let reply = model.chat(&[Message::user("hi")]).await.unwrap();
        assert_eq!(reply, "from openai");
    }

    #[test]
    fn openai_requires_api_key() {
        let config = ModelConfig {
            provider: "openai".to_string(),
            api_key_env: "WEBLOAD_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ModelConfig::default()
        };
        let err = OpenAiChat::new(&config).err().unwrap();
        assert!(matches!(err, ModelError::MissingApiKey(_)));
    }

    #[test]
    fn reply_at_rejects_blank_content() {
        let json = serde_json::json!({"message": {"content": "   "}});
        assert!(matches!(
            reply_at(&json, "/message/content"),
            Err(ModelError::EmptyReply)
        ));
        assert!(matches!(
            reply_at(&json, "/choices/0/message/content"),
            Err(ModelError::InvalidResponse(_))
        ));
    }

    // ── ModelClient ─────────────────────────────────────────────────

    struct StaticModel(Result<&'static str, ()>);

    #[async_trait]
    impl ChatModel for StaticModel {
        fn model_id(&self) -> &str {
            "static"
        }
        async fn chat(&self, _messages: &[Message]) -> Result<String, ModelError> {
            self.0
                .map(str::to_string)
                .map_err(|_| ModelError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
        }
        async fn health_check(&self) -> Result<(), ModelError> {
            Ok(())
        }
    }

    struct HangingModel;

    #[async_trait]
    impl ChatModel for HangingModel {
        fn model_id(&self) -> &str {
            "hanging"
        }
        async fn chat(&self, _messages: &[Message]) -> Result<String, ModelError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
        async fn health_check(&self) -> Result<(), ModelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn complete_passes_reply_through() {
        let client = ModelClient::new(Arc::new(StaticModel(Ok("answer"))), &ModelConfig::default());
        assert_eq!(client.complete(&[Message::user("q")]).await, "answer");
    }

    #[tokio::test]
    async fn complete_falls_back_on_error() {
        let client = ModelClient::new(Arc::new(StaticModel(Err(()))), &ModelConfig::default());
        let reply = client.complete(&[Message::user("q")]).await;
        assert_eq!(reply, "I'm sorry, I couldn't process that request.");
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let client = ModelClient::new(Arc::new(StaticModel(Ok("  "))), &ModelConfig::default());
        assert!(matches!(
            client.try_complete(&[Message::user("q")]).await,
            Err(ModelError::EmptyReply)
        ));
        assert!(!client.complete(&[Message::user("q")]).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_times_out() {
        let config = ModelConfig {
            timeout_secs: 5,
            ..ModelConfig::default()
        };
        let client = ModelClient::new(Arc::new(HangingModel), &config);
        assert!(matches!(
            client.try_complete(&[Message::user("q")]).await,
            Err(ModelError::Timeout(5))
        ));
    }

    #[test]
    fn factory_builds_ollama_by_default() {
        let model = create_chat_model(&ModelConfig::default()).unwrap();
        assert_eq!(model.model_id(), "qwen2.5:0.5b");
    }

    #[test]
    fn factory_rejects_unknown_provider() {
        let config = ModelConfig {
            provider: "llamacpp".to_string(),
            ..ModelConfig::default()
        };
        let err = create_chat_model(&config).err().unwrap();
        assert!(matches!(err, ModelError::UnknownProvider(ref p) if p == "llamacpp"));
        assert_eq!(err.to_string(), "unknown model provider: llamacpp");
    }
}
