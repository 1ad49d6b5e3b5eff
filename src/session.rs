//! Session driver: one conversation with a chat model.
//!
//! A turn sends the transcript, then keeps asking the model to continue while
//! its reply is cut off (open code fence or output token limit). The fragments
//! are spliced back into a single AI message and the synthetic continue
//! prompts are removed, so the returned transcript reads as a natural exchange.
//!
//! ```text
//! send ──► Received ──incomplete──► append continue prompt ──► send ──┐
//!             ▲                                                       │
//!             └───────────────────────────────────────────────────────┘
//!             │ complete / limit reached
//!             ▼
//!           Done: merge fragments ─► filter continue prompts ─► transcript
//! ```
//!
//! Each call's usage goes into the session's [`TokenUsageLedger`] as soon as
//! the call returns.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::continuation::{
    join_fragments, merge_messages, needs_continuation, remove_continue_messages,
    CONTINUE_PROMPT,
};
use crate::error::{Error, Result};
use crate::ledger::{estimate_prompt_tokens, estimate_tokens, TokenUsageLedger};
use crate::llm::{ChatClient, CompletionRequest, CompletionResponse, TokenUsage};
use crate::message::{collapse_consecutive_roles, Message, Transcript};
use crate::pricing::RateTable;

/// Configuration for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Maximum tokens per model call
    pub max_tokens: Option<u32>,
    /// Maximum continuation requests per turn (default: 10)
    pub max_continuations: u32,
    /// Human prompt used to ask for the rest of a truncated reply
    pub continue_prompt: String,
    /// Also continue when the provider reports the output token limit was hit
    pub continue_on_max_tokens: bool,
    /// Merge consecutive same-role messages before sending
    pub collapse_consecutive_roles: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: Some(0.1),
            max_tokens: None,
            max_continuations: 10,
            continue_prompt: CONTINUE_PROMPT.to_string(),
            continue_on_max_tokens: true,
            collapse_consecutive_roles: false,
        }
    }
}

impl SessionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `CONVO_MODEL`, `CONVO_TEMPERATURE` and `CONVO_MAX_CONTINUATIONS`;
    /// unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("CONVO_MODEL") {
            config.model = model;
        }
        if let Ok(raw) = std::env::var("CONVO_TEMPERATURE") {
            let temperature: f64 = raw
                .parse()
                .map_err(|_| Error::Config(format!("CONVO_TEMPERATURE is not a number: {}", raw)))?;
            config.temperature = Some(temperature.clamp(0.0, 1.0));
        }
        if let Ok(raw) = std::env::var("CONVO_MAX_CONTINUATIONS") {
            config.max_continuations = raw.parse().map_err(|_| {
                Error::Config(format!("CONVO_MAX_CONTINUATIONS is not an integer: {}", raw))
            })?;
        }

        Ok(config)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_continuations(mut self, max_continuations: u32) -> Self {
        self.max_continuations = max_continuations;
        self
    }

    pub fn with_continue_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.continue_prompt = prompt.into();
        self
    }

    pub fn with_continue_on_max_tokens(mut self, enabled: bool) -> Self {
        self.continue_on_max_tokens = enabled;
        self
    }

    pub fn with_collapse_consecutive_roles(mut self, enabled: bool) -> Self {
        self.collapse_consecutive_roles = enabled;
        self
    }
}

/// Summary of the most recent turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub step_name: String,
    /// Model replies received, including continuations
    pub fragments: usize,
    /// Continue prompts sent
    pub continuations: u32,
    /// The reply was still incomplete when the continuation limit was reached
    pub hit_continuation_limit: bool,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Received,
    Done,
}

/// A conversation with one chat model.
pub struct Session {
    id: Uuid,
    client: Arc<dyn ChatClient>,
    config: SessionConfig,
    ledger: TokenUsageLedger,
    last_turn: Option<TurnReport>,
}

impl Session {
    /// Create a session priced with the built-in rate table.
    pub fn new(client: Arc<dyn ChatClient>, config: SessionConfig) -> Self {
        Self::with_rates(client, config, Arc::new(RateTable::builtin()))
    }

    /// Create a session priced with a shared rate table.
    pub fn with_rates(
        client: Arc<dyn ChatClient>,
        config: SessionConfig,
        rates: Arc<RateTable>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            config,
            ledger: TokenUsageLedger::new(rates),
            last_turn: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn ledger(&self) -> &TokenUsageLedger {
        &self.ledger
    }

    pub fn last_turn(&self) -> Option<&TurnReport> {
        self.last_turn.as_ref()
    }

    /// Total cost in USD of every call made by this session.
    pub fn usage_cost(&self) -> f64 {
        self.ledger.usage_cost()
    }

    /// Open a conversation with a system and a human prompt.
    pub async fn start(
        &mut self,
        system_prompt: &str,
        human_prompt: &str,
        step_name: &str,
    ) -> Result<Transcript> {
        let transcript = vec![Message::system(system_prompt), Message::human(human_prompt)];
        self.run_turn(transcript, step_name).await
    }

    /// Continue a conversation with a new human prompt.
    pub async fn next(
        &mut self,
        mut transcript: Transcript,
        human_prompt: &str,
        step_name: &str,
    ) -> Result<Transcript> {
        transcript.push(Message::human(human_prompt));
        self.run_turn(transcript, step_name).await
    }

    /// Ask the model for another turn without adding a human prompt.
    pub async fn resume(&mut self, transcript: Transcript, step_name: &str) -> Result<Transcript> {
        self.run_turn(transcript, step_name).await
    }

    #[instrument(skip(self, transcript), fields(session = %self.id, model = %self.config.model))]
    async fn run_turn(&mut self, mut transcript: Transcript, step_name: &str) -> Result<Transcript> {
        let turn_start = transcript.len();
        let mut report = TurnReport {
            step_name: step_name.to_string(),
            fragments: 0,
            continuations: 0,
            hit_continuation_limit: false,
            prompt_tokens: 0,
            completion_tokens: 0,
        };

        // Detection looks at the reply as spliced so far, not the last fragment.
        let mut reply = String::new();
        let mut spent = TokenUsage::default();
        let mut state = TurnState::Received;
        while state == TurnState::Received {
            let (response, usage) = self.send(&transcript, step_name).await?;
            spent += usage;
            report.fragments += 1;

            reply = join_fragments(&reply, &response.content);
            let incomplete = needs_continuation(&reply)
                || (self.config.continue_on_max_tokens && response.hit_token_limit());
            transcript.push(Message::ai(response.content));

            state = if !incomplete {
                TurnState::Done
            } else if report.continuations >= self.config.max_continuations {
                warn!(
                    continuations = report.continuations,
                    "Reply still incomplete at continuation limit"
                );
                report.hit_continuation_limit = true;
                TurnState::Done
            } else {
                debug!(
                    continuation = report.continuations + 1,
                    "Reply truncated; requesting continuation"
                );
                transcript.push(Message::human(self.config.continue_prompt.clone()));
                report.continuations += 1;
                TurnState::Received
            };
        }

        report.prompt_tokens = spent.prompt_tokens;
        report.completion_tokens = spent.completion_tokens;

        let turn = transcript.split_off(turn_start);
        let fragments = remove_continue_messages(&turn, &self.config.continue_prompt);
        transcript.extend(merge_messages(&fragments));
        let transcript = remove_continue_messages(&transcript, &self.config.continue_prompt);

        info!(
            fragments = report.fragments,
            continuations = report.continuations,
            tokens = spent.total(),
            "Turn complete"
        );
        self.last_turn = Some(report);
        Ok(transcript)
    }

    /// One model call. Usage is recorded before returning.
    async fn send(
        &mut self,
        transcript: &[Message],
        step_name: &str,
    ) -> Result<(CompletionResponse, TokenUsage)> {
        let messages = if self.config.collapse_consecutive_roles {
            collapse_consecutive_roles(transcript)
        } else {
            transcript.to_vec()
        };

        let mut request = CompletionRequest::new(self.config.model.clone(), messages);
        request.temperature = self.config.temperature;
        request.max_tokens = self.config.max_tokens;

        debug!(
            provider = self.client.provider(),
            messages = request.messages.len(),
            "Creating a new chat completion"
        );
        let response = self.client.complete(request).await?;

        // Providers that omit usage are costed from an estimate.
        let usage = response.usage.unwrap_or_else(|| {
            TokenUsage::new(
                estimate_prompt_tokens(transcript),
                estimate_tokens(&response.content),
            )
        });
        self.ledger.record_step(
            step_name,
            usage.prompt_tokens,
            usage.completion_tokens,
            &self.config.model,
        );

        Ok((response, usage))
    }
}
