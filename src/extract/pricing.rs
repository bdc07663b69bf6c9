//! Static per-model pricing for extraction cost accounting

use crate::extract::TokenUsage;

/// Per-million-token pricing for one model
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub model: &'static str,
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Known model prices in USD per million tokens
pub const MODEL_PRICING: &[ModelPrice] = &[
    ModelPrice {
        model: "meta-llama/llama-4-scout-17b-16e-instruct",
        input_per_mtok: 0.11,
        output_per_mtok: 0.34,
    },
    ModelPrice {
        model: "meta-llama/llama-4-maverick-17b-128e-instruct",
        input_per_mtok: 0.20,
        output_per_mtok: 0.60,
    },
];

/// Cost of one extraction call, in USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Computes the cost of a call from its token usage
///
/// Returns `None` for models missing from the price table; unknown pricing
/// is reported as unavailable, never as an error.
pub fn estimate_cost(usage: &TokenUsage, model: &str) -> Option<CostBreakdown> {
    let price = MODEL_PRICING.iter().find(|p| p.model == model)?;

    let input_cost = usage.input_tokens as f64 / 1_000_000.0 * price.input_per_mtok;
    let output_cost = usage.output_tokens as f64 / 1_000_000.0 * price.output_per_mtok;

    Some(CostBreakdown {
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_cost() {
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 2_000_000,
            total_tokens: 3_000_000,
        };

        let cost = estimate_cost(&usage, "meta-llama/llama-4-scout-17b-16e-instruct").unwrap();
        assert!((cost.input_cost - 0.11).abs() < 1e-9);
        assert!((cost.output_cost - 0.68).abs() < 1e-9);
        assert!((cost.total_cost - 0.79).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_has_no_pricing() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 100,
            total_tokens: 200,
        };
        assert!(estimate_cost(&usage, "some/unknown-model").is_none());
    }

    #[test]
    fn test_zero_usage_costs_nothing() {
        let usage = TokenUsage {
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
        };
        let cost = estimate_cost(&usage, "meta-llama/llama-4-maverick-17b-128e-instruct").unwrap();
        assert_eq!(cost.total_cost, 0.0);
    }
}
