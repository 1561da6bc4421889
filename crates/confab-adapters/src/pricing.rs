//! Cost estimation from per-model token counts.
//!
//! Rates are $/million tokens. Cache reads are billed at 10% of the model's
//! input rate; cache writes are not billed. Models the table does not
//! recognize fall back to the mid-tier rate.

use confab_types::TokenUsage;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct ModelRate {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

const OPUS_RATE: ModelRate = ModelRate {
    input_per_mtok: 15.0,
    output_per_mtok: 75.0,
};

const SONNET_RATE: ModelRate = ModelRate {
    input_per_mtok: 3.0,
    output_per_mtok: 15.0,
};

const HAIKU_RATE: ModelRate = ModelRate {
    input_per_mtok: 0.8,
    output_per_mtok: 4.0,
};

/// Fallback for unrecognized model names.
pub const DEFAULT_RATE: ModelRate = SONNET_RATE;

const CACHE_READ_DISCOUNT: f64 = 0.1;

pub fn rate_for(model: &str) -> ModelRate {
    let model = model.to_ascii_lowercase();
    if model.contains("opus") {
        OPUS_RATE
    } else if model.contains("haiku") {
        HAIKU_RATE
    } else if model.contains("sonnet") {
        SONNET_RATE
    } else {
        DEFAULT_RATE
    }
}

/// Estimated USD cost of one model's usage.
pub fn estimate_model_cost(model: &str, usage: &TokenUsage) -> f64 {
    let rate = rate_for(model);
    let input = usage.input as f64 * rate.input_per_mtok;
    let output = usage.output as f64 * rate.output_per_mtok;
    let cache_read = usage.cache_read as f64 * rate.input_per_mtok * CACHE_READ_DISCOUNT;
    (input + output + cache_read) / 1_000_000.0
}

/// Estimated USD cost across every model seen in a session.
pub fn estimate_cost(usage_by_model: &HashMap<String, TokenUsage>) -> f64 {
    usage_by_model
        .iter()
        .map(|(model, usage)| estimate_model_cost(model, usage))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_families() {
        assert_eq!(rate_for("claude-opus-4-20250514").input_per_mtok, 15.0);
        assert_eq!(rate_for("claude-3-5-haiku-latest").input_per_mtok, 0.8);
        assert_eq!(rate_for("claude-sonnet-4-20250514").output_per_mtok, 15.0);
    }

    #[test]
    fn test_unknown_model_uses_default_rate() {
        let rate = rate_for("experimental-model-x");
        assert_eq!(rate.input_per_mtok, DEFAULT_RATE.input_per_mtok);
    }

    #[test]
    fn test_cache_reads_cost_a_tenth_of_input() {
        let usage = TokenUsage {
            input: 0,
            output: 0,
            cache_read: 1_000_000,
            cache_write: 0,
        };
        let cost = estimate_model_cost("claude-sonnet-4", &usage);
        assert!((cost - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_session_cost_sums_models() {
        let mut by_model = HashMap::new();
        by_model.insert(
            "claude-sonnet-4".to_string(),
            TokenUsage {
                input: 1_000_000,
                output: 0,
                cache_read: 0,
                cache_write: 0,
            },
        );
        by_model.insert(
            "claude-opus-4".to_string(),
            TokenUsage {
                input: 0,
                output: 1_000_000,
                cache_read: 0,
                cache_write: 0,
            },
        );
        let cost = estimate_cost(&by_model);
        assert!((cost - 78.0).abs() < 1e-9);
    }
}
