//! In-memory chat client that replays scripted replies.
//!
//! Useful for tests and offline runs of code that drives a [`Session`].
//! Replies are returned in order and the script starts over once it is
//! exhausted. Every request is recorded for later inspection.
//!
//! [`Session`]: crate::session::Session

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

use super::client::ChatClient;
use super::types::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};

/// One scripted step.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Reply with this content
    Text {
        content: String,
        usage: Option<TokenUsage>,
        stop_reason: Option<StopReason>,
    },
    /// Fail as an unavailable model
    Unavailable(String),
    /// Fail as rate limited
    RateLimited(String),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            usage: None,
            stop_reason: None,
        }
    }

    /// Reply with provider-reported usage.
    pub fn with_usage(self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        match self {
            Self::Text {
                content,
                stop_reason,
                ..
            } => Self::Text {
                content,
                usage: Some(TokenUsage::new(prompt_tokens, completion_tokens)),
                stop_reason,
            },
            other => other,
        }
    }

    /// Reply with a stop reason.
    pub fn with_stop_reason(self, reason: StopReason) -> Self {
        match self {
            Self::Text { content, usage, .. } => Self::Text {
                content,
                usage,
                stop_reason: Some(reason),
            },
            other => other,
        }
    }
}

/// A [`ChatClient`] backed by a fixed script.
#[derive(Clone)]
pub struct ScriptedClient {
    replies: Arc<Vec<ScriptedReply>>,
    cursor: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedClient {
    const PROVIDER: &'static str = "scripted";

    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(replies),
            cursor: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script plain text replies.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(ScriptedReply::text).collect())
    }

    /// Number of completed calls, including failed ones.
    pub fn call_count(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if self.replies.is_empty() {
            return Err(Error::model_unavailable(Self::PROVIDER, "empty script"));
        }

        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.replies.len();
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        match &self.replies[index] {
            ScriptedReply::Text {
                content,
                usage,
                stop_reason,
            } => Ok(CompletionResponse {
                model,
                content: content.clone(),
                usage: *usage,
                stop_reason: *stop_reason,
            }),
            ScriptedReply::Unavailable(message) => {
                Err(Error::model_unavailable(Self::PROVIDER, message.clone()))
            }
            ScriptedReply::RateLimited(message) => {
                Err(Error::rate_limited(Self::PROVIDER, message.clone(), None))
            }
        }
    }

    fn provider(&self) -> &str {
        Self::PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn request() -> CompletionRequest {
        CompletionRequest::new("gpt-4", vec![Message::human("hi")])
    }

    #[tokio::test]
    async fn test_replies_in_order_and_cycle() {
        let client = ScriptedClient::from_texts(["response1", "response2"]);

        let mut contents = Vec::new();
        for _ in 0..3 {
            contents.push(client.complete(request()).await.unwrap().content);
        }

        assert_eq!(contents, vec!["response1", "response2", "response1"]);
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_reply_echoes_model_and_usage() {
        let client = ScriptedClient::new(vec![ScriptedReply::text("ok")
            .with_usage(12, 3)
            .with_stop_reason(StopReason::MaxTokens)]);

        let response = client.complete(request()).await.unwrap();
        assert_eq!(response.model, "gpt-4");
        assert_eq!(response.usage, Some(TokenUsage::new(12, 3)));
        assert!(response.hit_token_limit());
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let client = ScriptedClient::new(vec![
            ScriptedReply::RateLimited("slow down".to_string()),
            ScriptedReply::Unavailable("down".to_string()),
        ]);

        assert!(matches!(
            client.complete(request()).await,
            Err(Error::RateLimited { .. })
        ));
        assert!(matches!(
            client.complete(request()).await,
            Err(Error::ModelUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_script_is_unavailable() {
        let client = ScriptedClient::new(Vec::new());
        assert!(client.complete(request()).await.unwrap_err().is_upstream());
        assert_eq!(client.call_count(), 0);
    }
}
