//! Chat model client abstraction.
//!
//! The session talks to models only through the [`ChatClient`] trait. HTTP
//! implementations for OpenAI-compatible and Anthropic endpoints are provided,
//! along with [`ScriptedClient`] for tests and offline runs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use convo_core::llm::{ChatClient, CompletionRequest, OpenAIClient};
//! use convo_core::Message;
//!
//! let client = OpenAIClient::from_env()?;
//! let request = CompletionRequest::new("gpt-4o", vec![Message::human("Hello")])
//!     .with_temperature(0.1);
//!
//! let response = client.complete(request).await?;
//! ```

mod client;
mod scripted;
mod types;

pub use client::{AnthropicClient, ChatClient, ClientConfig, OpenAIClient};
pub use scripted::{ScriptedClient, ScriptedReply};
pub use types::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
