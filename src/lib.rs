//! # convo-core
//!
//! Conversational session management for chat LLMs, with repair of truncated
//! model output and token cost accounting.
//!
//! ## Core Components
//!
//! - **Message**: role-tagged conversation content and transcripts
//! - **Continuation**: detect replies cut off inside a code fence, splice
//!   continuation fragments, and strip the synthetic continue prompts
//! - **Ledger**: per-call token usage and cost against an injected rate table
//! - **Session**: drives a turn end to end against a [`ChatClient`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use convo_core::{OpenAIClient, Session, SessionConfig};
//!
//! let client = Arc::new(OpenAIClient::from_env()?);
//! let mut session = Session::new(client, SessionConfig::new("gpt-4o"));
//!
//! let transcript = session
//!     .start("You write Python.", "Write a hello world script", "generate")
//!     .await?;
//! let transcript = session
//!     .next(transcript, "Add a main guard", "improve")
//!     .await?;
//!
//! println!("{}", transcript.last().unwrap().content);
//! println!("cost: ${:.4}", session.usage_cost());
//! ```

pub mod continuation;
pub mod error;
pub mod ledger;
pub mod llm;
pub mod message;
pub mod pricing;
pub mod session;

// Re-exports for convenience
pub use continuation::{
    merge_messages, needs_continuation, remove_continue_messages, CONTINUE_PROMPT,
};
pub use error::{Error, Result};
pub use ledger::{TokenUsageLedger, UsageRecord};
pub use llm::{
    AnthropicClient, ChatClient, ClientConfig, CompletionRequest, CompletionResponse,
    OpenAIClient, ScriptedClient, ScriptedReply, StopReason, TokenUsage,
};
pub use message::{deserialize_messages, serialize_messages, Message, Role, Transcript};
pub use pricing::{ModelRate, RateTable};
pub use session::{Session, SessionConfig, TurnReport};
