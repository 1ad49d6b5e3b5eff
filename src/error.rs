//! Error types for convo-core.

use thiserror::Error;

/// Result type alias using convo-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a conversation turn.
///
/// Only upstream failures and configuration problems surface here. Fence
/// ambiguity during merging and unpriced models in the ledger degrade to a
/// safe result and are logged instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The model endpoint could not be reached or reported itself unavailable
    #[error("Model unavailable: {provider} - {message}")]
    ModelUnavailable { provider: String, message: String },

    /// The provider rejected the request due to rate limits
    #[error("Rate limited by {provider}: {message}")]
    RateLimited {
        provider: String,
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other failure reported by the model endpoint
    #[error("LLM API error: {provider} - {message}")]
    LlmApi { provider: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a model-unavailable error.
    pub fn model_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate-limited error.
    pub fn rate_limited(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
            retry_after_secs,
        }
    }

    /// Create an LLM API error.
    pub fn llm_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error originated from the model client.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. } | Self::RateLimited { .. } | Self::LlmApi { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(Error::model_unavailable("openai", "connection refused").is_upstream());
        assert!(Error::rate_limited("openai", "slow down", Some(20)).is_upstream());
        assert!(Error::llm_api("anthropic", "bad request").is_upstream());
        assert!(!Error::Config("missing key".to_string()).is_upstream());
    }

    #[test]
    fn test_display() {
        let err = Error::rate_limited("openai", "too many requests", None);
        assert_eq!(
            err.to_string(),
            "Rate limited by openai: too many requests"
        );
    }
}
