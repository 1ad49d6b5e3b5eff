//! Model token pricing.
//!
//! A [`RateTable`] is built once and shared read-only (`Arc<RateTable>`)
//! between sessions. Lookups never fail: models without a registered rate
//! fall back to the table's default rate, which is zero unless configured.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model pricing per 1M tokens (USD).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    /// Cost per 1M prompt tokens
    pub input_per_million: f64,
    /// Cost per 1M completion tokens
    pub output_per_million: f64,
}

impl ModelRate {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of a single call.
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let input_cost = (prompt_tokens as f64 / 1_000_000.0) * self.input_per_million;
        let output_cost = (completion_tokens as f64 / 1_000_000.0) * self.output_per_million;
        input_cost + output_cost
    }
}

/// Read-only lookup from model name to rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<String, ModelRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback: Option<ModelRate>,
}

impl RateTable {
    /// An empty table: every model is unpriced.
    pub fn new() -> Self {
        Self::default()
    }

    /// Published list prices for common OpenAI and Anthropic models.
    pub fn builtin() -> Self {
        Self::new()
            // OpenAI
            .with_rate("gpt-4", ModelRate::new(30.0, 60.0))
            .with_rate("gpt-4-32k", ModelRate::new(60.0, 120.0))
            .with_rate("gpt-4-turbo", ModelRate::new(10.0, 30.0))
            .with_rate("gpt-4-1106-preview", ModelRate::new(10.0, 30.0))
            .with_rate("gpt-4o", ModelRate::new(2.50, 10.0))
            .with_rate("gpt-4o-mini", ModelRate::new(0.15, 0.60))
            .with_rate("gpt-3.5-turbo", ModelRate::new(0.50, 1.50))
            .with_rate("o1", ModelRate::new(15.0, 60.0))
            .with_rate("o1-mini", ModelRate::new(3.0, 12.0))
            // Anthropic
            .with_rate("claude-3-opus", ModelRate::new(15.0, 75.0))
            .with_rate("claude-3-sonnet", ModelRate::new(3.0, 15.0))
            .with_rate("claude-3-5-sonnet", ModelRate::new(3.0, 15.0))
            .with_rate("claude-3-haiku", ModelRate::new(0.25, 1.25))
            .with_rate("claude-3-5-haiku", ModelRate::new(0.80, 4.0))
    }

    /// Register or replace a model's rate.
    pub fn with_rate(mut self, model: impl Into<String>, rate: ModelRate) -> Self {
        self.rates.insert(model.into(), rate);
        self
    }

    /// Rate used for models with no registered entry.
    pub fn with_fallback(mut self, rate: ModelRate) -> Self {
        self.fallback = Some(rate);
        self
    }

    /// Registered rate for `model`: exact name first, then the longest
    /// registered prefix (so dated snapshots resolve to their family).
    pub fn lookup(&self, model: &str) -> Option<ModelRate> {
        if let Some(rate) = self.rates.get(model) {
            return Some(*rate);
        }

        self.rates
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, rate)| *rate)
    }

    /// Rate for `model`, falling back to the default (zero unless configured).
    pub fn rate_for(&self, model: &str) -> ModelRate {
        self.lookup(model)
            .or(self.fallback)
            .unwrap_or(ModelRate::ZERO)
    }

    pub fn is_priced(&self, model: &str) -> bool {
        self.lookup(model).is_some()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
