//! Text Service Gateway: chat-completion calls to an OpenAI-compatible API.
//!
//! The learner supplies the credential per request, so the client holds no key.
//! Each call is a single exchange bounded by the configured timeout; failures
//! come back as a typed [`GatewayError`] and are never retried here.
//!
//! NOTE: credentials are never logged, and error bodies are truncated before they
//! reach logs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::GatewaySettings;
use crate::prompts::PromptPair;
use crate::util::trunc_for_log;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
  #[error("credential rejected by the text service")]
  Unauthorized,
  #[error("quota or rate limit exceeded")]
  QuotaExceeded,
  #[error("text service timed out")]
  Timeout,
  #[error("transport error: {0}")]
  Transport(String),
  #[error("text service returned HTTP {status}: {body}")]
  Upstream { status: u16, body: String },
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}

/// One chat-completion exchange.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatRequest {
  pub model: String,
  pub messages: Vec<ChatMessage>,
  pub max_tokens: u32,
  pub temperature: f32,
}

impl ChatRequest {
  pub fn new(model: &str, max_tokens: u32, temperature: f32) -> Self {
    Self { model: model.to_string(), messages: Vec::new(), max_tokens, temperature }
  }

  pub fn system(mut self, content: impl Into<String>) -> Self {
    self.messages.push(ChatMessage { role: Role::System, content: content.into() });
    self
  }

  pub fn user(mut self, content: impl Into<String>) -> Self {
    self.messages.push(ChatMessage { role: Role::User, content: content.into() });
    self
  }

  pub fn prompt(self, pair: PromptPair) -> Self {
    self.system(pair.system).user(pair.user)
  }
}

/// Anything that can answer a chat request with generated text.
#[async_trait]
pub trait TextGateway: Send + Sync {
  async fn complete(&self, credential: &str, request: &ChatRequest) -> Result<String, GatewayError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl OpenAI {
  pub fn new(settings: &GatewaySettings) -> Result<Self, GatewayError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()
      .map_err(|e| GatewayError::Transport(e.to_string()))?;
    Ok(Self::with_client(client, &settings.base_url))
  }

  pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
    Self { client, base_url: base_url.trim_end_matches('/').to_string() }
  }
}

#[async_trait]
impl TextGateway for OpenAI {
  #[instrument(
    target = "gateway",
    level = "info",
    skip(self, credential, request),
    fields(model = %request.model, max_tokens = request.max_tokens, messages = request.messages.len())
  )]
  async fn complete(&self, credential: &str, request: &ChatRequest) -> Result<String, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "vibecode-tutor/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", credential))
      .json(request).send().await.map_err(map_transport)?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(target: "gateway", status = status.as_u16(), elapsed = ?start.elapsed(), message = %trunc_for_log(&msg, 200), "Text service call failed");
      return Err(map_status(status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(map_transport)?;
    if let Some(usage) = &body.usage {
      info!(target: "gateway", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default().trim().to_string();

    info!(target: "gateway", elapsed = ?start.elapsed(), response_len = text.len(), "Text service call succeeded");
    Ok(text)
  }
}

fn map_transport(e: reqwest::Error) -> GatewayError {
  if e.is_timeout() { GatewayError::Timeout } else { GatewayError::Transport(e.to_string()) }
}

fn map_status(status: StatusCode, body: String) -> GatewayError {
  match status.as_u16() {
    401 | 403 => GatewayError::Unauthorized,
    402 | 429 => GatewayError::QuotaExceeded,
    408 | 504 => GatewayError::Timeout,
    code => GatewayError::Upstream { status: code, body },
  }
}

// --- Chat DTOs ---

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;
  use serde_json::json;

  fn request() -> ChatRequest {
    ChatRequest::new("gpt-4o-mini", 5, 0.8).user("Hi")
  }

  fn client(server: &MockServer, timeout: Duration) -> OpenAI {
    let http = reqwest::Client::builder().timeout(timeout).build().expect("client");
    OpenAI::with_client(http, &format!("{}/v1/", server.base_url()))
  }

  #[tokio::test]
  async fn returns_trimmed_completion_and_sends_expected_shape() {
    let server = MockServer::start_async().await;
    let mock = server.mock_async(|when, then| {
      when.method(POST)
        .path("/v1/chat/completions")
        .header("authorization", "Bearer sk-test")
        .json_body_partial(r#"{"model": "gpt-4o-mini", "max_tokens": 5}"#)
        .body_contains(r#""messages":[{"role":"user","content":"Hi"}]"#);
      then.status(200).json_body(json!({
        "choices": [{"message": {"content": "  Hello!\n"}}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
      }));
    }).await;

    let oa = client(&server, Duration::from_secs(5));
    let text = oa.complete("sk-test", &request()).await.expect("completion");
    assert_eq!(text, "Hello!");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn maps_status_codes_to_typed_failures() {
    let cases = [
      (401, GatewayError::Unauthorized),
      (429, GatewayError::QuotaExceeded),
      (500, GatewayError::Upstream { status: 500, body: "boom".into() }),
    ];
    for (status, expected) in cases {
      let server = MockServer::start_async().await;
      server.mock_async(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(status).json_body(json!({"error": {"message": "boom"}}));
      }).await;

      let err = client(&server, Duration::from_secs(5)).complete("sk-x", &request()).await.unwrap_err();
      assert_eq!(err, expected, "status {status}");
    }
  }

  #[tokio::test]
  async fn upstream_error_keeps_raw_body_when_not_openai_shaped() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
      when.method(POST).path("/v1/chat/completions");
      then.status(503).body("maintenance");
    }).await;

    let err = client(&server, Duration::from_secs(5)).complete("sk-x", &request()).await.unwrap_err();
    assert_eq!(err, GatewayError::Upstream { status: 503, body: "maintenance".into() });
  }

  #[tokio::test]
  async fn slow_service_times_out() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
      when.method(POST).path("/v1/chat/completions");
      then.status(200)
        .delay(Duration::from_secs(3))
        .json_body(json!({"choices": [{"message": {"content": "late"}}]}));
    }).await;

    let err = client(&server, Duration::from_millis(200)).complete("sk-x", &request()).await.unwrap_err();
    assert_eq!(err, GatewayError::Timeout);
  }

  #[tokio::test]
  async fn unreachable_service_is_transport_error() {
    let oa = OpenAI::with_client(reqwest::Client::new(), "http://127.0.0.1:9");
    let err = oa.complete("sk-x", &request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");
  }

  #[test]
  fn request_builder_orders_messages() {
    let r = ChatRequest::new("m", 10, 0.2).prompt(PromptPair { system: "s".into(), user: "u".into() });
    assert_eq!(r.messages[0], ChatMessage { role: Role::System, content: "s".into() });
    assert_eq!(r.messages[1], ChatMessage { role: Role::User, content: "u".into() });
  }
}
