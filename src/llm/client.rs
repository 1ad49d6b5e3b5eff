//! Chat client trait and HTTP provider implementations.
//!
//! The clients translate a [`CompletionRequest`] into one provider call and map
//! transport and HTTP failures onto the crate's upstream error kinds. They do
//! not retry; callers that want backoff wrap the trait.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::Role;

use super::types::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};

/// A remote chat model the session can send transcripts to.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the conversation and return the model's next turn.
    ///
    /// Fails with [`Error::ModelUnavailable`], [`Error::RateLimited`] or
    /// [`Error::LlmApi`].
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name used in logs and errors.
    fn provider(&self) -> &str;
}

/// Configuration for HTTP chat clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key
    pub api_key: String,
    /// Base URL override
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout_secs: 120,
        }
    }

    /// Read the API key from the named environment variable.
    pub fn from_env(key_var: &str) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .map_err(|_| Error::Config(format!("{} is not set", key_var)))?;
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!("{} is empty", key_var)));
        }
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

fn build_http_client(provider: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("{} HTTP client: {}", provider, e)))
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map a non-success HTTP status onto an upstream error kind.
fn status_error(provider: &str, status: u16, retry_after_secs: Option<u64>, body: &str) -> Error {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

    match status {
        429 => Error::rate_limited(provider, message, retry_after_secs),
        500 | 502 | 503 | 504 | 529 => Error::model_unavailable(provider, message),
        _ => Error::llm_api(provider, message),
    }
}

/// POST a JSON body and return the raw success body.
async fn post_json<B: Serialize + ?Sized>(
    http: &Client,
    provider: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: &B,
) -> Result<String> {
    let mut builder = http.post(url).header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = builder
        .json(body)
        .send()
        .await
        .map_err(|e| Error::model_unavailable(provider, format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let text = response
        .text()
        .await
        .map_err(|e| Error::model_unavailable(provider, format!("Failed to read response: {}", e)))?;

    debug!(provider, status = status.as_u16(), bytes = text.len(), "Chat completion response");

    if !status.is_success() {
        return Err(status_error(provider, status.as_u16(), retry_after_secs, &text));
    }
    Ok(text)
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIReply,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAIClient {
    config: ClientConfig,
    http: Client,
}

impl OpenAIClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";
    const PROVIDER: &'static str = "openai";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(Self::PROVIDER, config.timeout_secs)?;
        Ok(Self { config, http })
    }

    /// Build from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let mut config = ClientConfig::from_env("OPENAI_API_KEY")?;
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(url);
        }
        Self::new(config)
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }
}

fn openai_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
        Role::Ai => "assistant",
    }
}

fn parse_openai_response(body: &str) -> Result<CompletionResponse> {
    let api_response: OpenAIResponse = serde_json::from_str(body).map_err(|e| {
        Error::llm_api(OpenAIClient::PROVIDER, format!("Failed to parse response: {}", e))
    })?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::llm_api(OpenAIClient::PROVIDER, "No choices in response"))?;

    Ok(CompletionResponse {
        model: api_response.model,
        content: choice.message.content.unwrap_or_default(),
        usage: api_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        stop_reason: choice.finish_reason.as_deref().map(StopReason::from_provider),
    })
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = OpenAIRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: openai_role(m.role),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url());
        let auth = format!("Bearer {}", self.config.api_key);
        let body = post_json(
            &self.http,
            Self::PROVIDER,
            &url,
            &[("Authorization", auth.as_str())],
            &api_request,
        )
        .await?;

        parse_openai_response(&body)
    }

    fn provider(&self) -> &str {
        Self::PROVIDER
    }
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Anthropic messages API client.
pub struct AnthropicClient {
    config: ClientConfig,
    http: Client,
}

impl AnthropicClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    const API_VERSION: &'static str = "2023-06-01";
    const DEFAULT_MAX_TOKENS: u32 = 4096;
    const PROVIDER: &'static str = "anthropic";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(Self::PROVIDER, config.timeout_secs)?;
        Ok(Self { config, http })
    }

    /// Build from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env("ANTHROPIC_API_KEY")?)
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }
}

/// Split system messages out of the transcript; the messages API takes them
/// as a separate top-level field.
fn anthropic_request(request: &CompletionRequest) -> AnthropicRequest<'_> {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let messages = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| AnthropicMessage {
            role: if m.is_ai() { "assistant" } else { "user" },
            content: &m.content,
        })
        .collect();

    AnthropicRequest {
        model: &request.model,
        messages,
        max_tokens: request
            .max_tokens
            .unwrap_or(AnthropicClient::DEFAULT_MAX_TOKENS),
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        temperature: request.temperature,
    }
}

fn parse_anthropic_response(body: &str) -> Result<CompletionResponse> {
    let api_response: AnthropicResponse = serde_json::from_str(body).map_err(|e| {
        Error::llm_api(AnthropicClient::PROVIDER, format!("Failed to parse response: {}", e))
    })?;

    let content = api_response
        .content
        .into_iter()
        .filter_map(|c| c.text)
        .collect::<Vec<_>>()
        .join("");

    Ok(CompletionResponse {
        model: api_response.model,
        content,
        usage: Some(TokenUsage::new(
            api_response.usage.input_tokens,
            api_response.usage.output_tokens,
        )),
        stop_reason: api_response.stop_reason.as_deref().map(StopReason::from_provider),
    })
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = anthropic_request(&request);
        let url = format!("{}/v1/messages", self.base_url());

        let body = post_json(
            &self.http,
            Self::PROVIDER,
            &url,
            &[
                ("x-api-key", self.config.api_key.as_str()),
                ("anthropic-version", Self::API_VERSION),
            ],
            &api_request,
        )
        .await?;

        parse_anthropic_response(&body)
    }

    fn provider(&self) -> &str {
        Self::PROVIDER
    }
}
