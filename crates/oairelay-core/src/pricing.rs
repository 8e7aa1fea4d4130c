//! Per-request cost estimation.
//!
//! Prices are static, in USD per one million tokens, and matched against the
//! model name by longest prefix so dated snapshots (`gpt-4o-2024-08-06`)
//! resolve to their family price.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Price of one model family, USD per 1M tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Model name prefix this price applies to.
    pub prefix: String,
    pub input: f64,
    pub cached_input: f64,
    pub output: f64,
}

impl ModelPrice {
    pub fn new(prefix: impl Into<String>, input: f64, cached_input: f64, output: f64) -> Self {
        Self {
            prefix: prefix.into(),
            input,
            cached_input,
            output,
        }
    }
}

/// Token counts reported by the Responses API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    /// Portion of `input_tokens` served from the prompt cache.
    pub cached_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Extract usage from a response object or a `response.completed` event
    /// payload (which nests the response under `response`).
    #[must_use]
    pub fn from_response(body: &Value) -> Option<Self> {
        let usage = body
            .get("usage")
            .or_else(|| body.pointer("/response/usage"))
            .filter(|usage| usage.is_object())?;

        let field = |pointer: &str| usage.pointer(pointer).and_then(Value::as_u64).unwrap_or(0);
        Some(Self {
            input_tokens: field("/input_tokens"),
            cached_tokens: field("/input_tokens_details/cached_tokens"),
            output_tokens: field("/output_tokens"),
        })
    }
}

/// Cost attached to `response` and `stream_completed` audit records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub model: String,
    pub usage: TokenUsage,
    pub usd: f64,
}

/// Looks up model prices and turns usage into dollars.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    prices: Vec<ModelPrice>,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(default_prices())
    }
}

impl CostEstimator {
    pub fn new(prices: Vec<ModelPrice>) -> Self {
        Self { prices }
    }

    /// Price for `model`, by longest matching prefix.
    #[must_use]
    pub fn price_for(&self, model: &str) -> Option<&ModelPrice> {
        self.prices
            .iter()
            .filter(|price| model.starts_with(price.prefix.as_str()))
            .max_by_key(|price| price.prefix.len())
    }

    /// Dollar cost of `usage` on `model`. Unknown models yield `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, model: &str, usage: TokenUsage) -> Option<CostEstimate> {
        let price = self.price_for(model)?;
        let cached = usage.cached_tokens.min(usage.input_tokens);
        let uncached = usage.input_tokens - cached;
        let usd = (uncached as f64).mul_add(
            price.input,
            (cached as f64).mul_add(price.cached_input, usage.output_tokens as f64 * price.output),
        ) / TOKENS_PER_UNIT;

        Some(CostEstimate {
            model: model.to_owned(),
            usage,
            usd,
        })
    }

    /// Estimate from a response body or `response.completed` event payload.
    #[must_use]
    pub fn estimate(&self, body: &Value) -> Option<CostEstimate> {
        let model = body
            .get("model")
            .or_else(|| body.pointer("/response/model"))
            .and_then(Value::as_str)?;
        let usage = TokenUsage::from_response(body)?;
        self.cost(model, usage)
    }
}

fn default_prices() -> Vec<ModelPrice> {
    vec![
        ModelPrice::new("gpt-4o", 2.50, 1.25, 10.00),
        ModelPrice::new("gpt-4o-mini", 0.15, 0.075, 0.60),
        ModelPrice::new("gpt-4.1", 2.00, 0.50, 8.00),
        ModelPrice::new("gpt-4.1-mini", 0.40, 0.10, 1.60),
        ModelPrice::new("gpt-4.1-nano", 0.10, 0.025, 0.40),
        ModelPrice::new("o3", 2.00, 0.50, 8.00),
        ModelPrice::new("o3-mini", 1.10, 0.55, 4.40),
        ModelPrice::new("o4-mini", 1.10, 0.275, 4.40),
        ModelPrice::new("gpt-5", 1.25, 0.125, 10.00),
        ModelPrice::new("gpt-5-mini", 0.25, 0.025, 2.00),
        ModelPrice::new("gpt-5-nano", 0.05, 0.005, 0.40),
    ]
}
