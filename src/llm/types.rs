//! LLM request and response types.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Completion request sent to a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g., "gpt-4o")
    pub model: String,
    /// Conversation so far, in order
    pub messages: Vec<Message>,
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage reported for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Map a provider finish/stop reason string.
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "length" | "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            _ => Self::EndTurn,
        }
    }
}

/// Completion response from a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Model that produced the reply
    pub model: String,
    /// Generated content
    pub content: String,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
    /// Stop reason, when the provider reports it
    pub stop_reason: Option<StopReason>,
}

impl CompletionResponse {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            usage: None,
            stop_reason: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_stop_reason(mut self, stop_reason: StopReason) -> Self {
        self.stop_reason = Some(stop_reason);
        self
    }

    /// Whether generation was cut off by the output token limit.
    pub fn hit_token_limit(&self) -> bool {
        self.stop_reason == Some(StopReason::MaxTokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("gpt-4o", vec![Message::human("Hi")])
            .with_max_tokens(1000)
            .with_temperature(1.7);

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.max_tokens, Some(1000));
        assert_eq!(req.temperature, Some(1.0));
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::new(100, 20);
        usage += TokenUsage::new(50, 5);

        assert_eq!(usage, TokenUsage::new(150, 25));
        assert_eq!(usage.total(), 175);
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(StopReason::from_provider("length"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_provider("max_tokens"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_provider("stop"), StopReason::EndTurn);
        assert_eq!(StopReason::from_provider("end_turn"), StopReason::EndTurn);
        assert_eq!(
            StopReason::from_provider("stop_sequence"),
            StopReason::StopSequence
        );
    }

    #[test]
    fn test_hit_token_limit() {
        let truncated = CompletionResponse::new("m", "x").with_stop_reason(StopReason::MaxTokens);
        assert!(truncated.hit_token_limit());
        assert!(!CompletionResponse::new("m", "x").hit_token_limit());
    }
}
