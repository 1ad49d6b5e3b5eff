//! Token usage accounting for a session.
//!
//! Every model call appends one [`UsageRecord`]. Records are never mutated.
//! Cost is computed on demand from the injected [`RateTable`], so the same
//! ledger can be re-priced by building it against a different table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

use crate::message::Message;
use crate::pricing::RateTable;

/// Per-message framing overhead used when estimating prompt tokens.
const TOKENS_PER_MESSAGE: u64 = 4;
/// Tokens that prime the assistant reply.
const REPLY_PRIMING_TOKENS: u64 = 2;

/// Rough token count for text: ~4 chars per token for English.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Rough prompt token count for a list of messages.
pub fn estimate_prompt_tokens(messages: &[Message]) -> u64 {
    messages
        .iter()
        .map(|m| TOKENS_PER_MESSAGE + estimate_tokens(&m.content))
        .sum::<u64>()
        + REPLY_PRIMING_TOKENS
}

/// Usage of a single model call, with running totals at the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Workflow step that made the call, if any
    pub step_name: Option<String>,
    /// Model the call was made against
    pub model_name: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Session prompt tokens including this call
    pub total_prompt_tokens: u64,
    /// Session completion tokens including this call
    pub total_completion_tokens: u64,
    pub recorded_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn tokens_in_step(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

/// Append-only log of usage records for one session.
#[derive(Debug, Clone)]
pub struct TokenUsageLedger {
    records: Vec<UsageRecord>,
    rates: Arc<RateTable>,
    unpriced: BTreeSet<String>,
}

impl TokenUsageLedger {
    pub fn new(rates: Arc<RateTable>) -> Self {
        Self {
            records: Vec::new(),
            rates,
            unpriced: BTreeSet::new(),
        }
    }

    /// Record a call that is not tied to a named step.
    pub fn record(&mut self, prompt_tokens: u64, completion_tokens: u64, model_name: &str) {
        self.push(None, prompt_tokens, completion_tokens, model_name);
    }

    /// Record a call made on behalf of `step_name`.
    pub fn record_step(
        &mut self,
        step_name: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        model_name: &str,
    ) {
        self.push(
            Some(step_name.to_string()),
            prompt_tokens,
            completion_tokens,
            model_name,
        );
    }

    fn push(
        &mut self,
        step_name: Option<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
        model_name: &str,
    ) {
        if !self.rates.is_priced(model_name) && self.unpriced.insert(model_name.to_string()) {
            warn!(model = model_name, "No token rate registered for model; costing at fallback rate");
        }

        let record = UsageRecord {
            step_name,
            model_name: model_name.to_string(),
            prompt_tokens,
            completion_tokens,
            total_prompt_tokens: self.total_prompt_tokens() + prompt_tokens,
            total_completion_tokens: self.total_completion_tokens() + completion_tokens,
            recorded_at: Utc::now(),
        };
        self.records.push(record);
    }

    /// Total cost in USD across all records.
    pub fn usage_cost(&self) -> f64 {
        self.records
            .iter()
            .map(|r| {
                self.rates
                    .rate_for(&r.model_name)
                    .cost(r.prompt_tokens, r.completion_tokens)
            })
            .sum()
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_prompt_tokens(&self) -> u64 {
        self.records.last().map_or(0, |r| r.total_prompt_tokens)
    }

    pub fn total_completion_tokens(&self) -> u64 {
        self.records.last().map_or(0, |r| r.total_completion_tokens)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_prompt_tokens() + self.total_completion_tokens()
    }

    /// Models recorded so far that have no registered rate.
    pub fn unpriced_models(&self) -> impl Iterator<Item = &str> {
        self.unpriced.iter().map(String::as_str)
    }

    /// CSV log of every record with running totals.
    pub fn format_log(&self) -> String {
        let mut log = String::from(
            "step_name,prompt_tokens_in_step,completion_tokens_in_step,total_tokens_in_step,\
             total_prompt_tokens,total_completion_tokens,total_tokens\n",
        );
        for r in &self.records {
            // Writing to a String cannot fail.
            let _ = writeln!(
                log,
                "{},{},{},{},{},{},{}",
                r.step_name.as_deref().unwrap_or(""),
                r.prompt_tokens,
                r.completion_tokens,
                r.tokens_in_step(),
                r.total_prompt_tokens,
                r.total_completion_tokens,
                r.total_tokens()
            );
        }
        log
    }
}

impl Default for TokenUsageLedger {
    fn default() -> Self {
        Self::new(Arc::new(RateTable::builtin()))
    }
}
