//! Best-effort API cost tracking.
//!
//! An optional collaborator: when no tracker is wired up, tracking is a
//! no-op. Persistence is fire-and-forget; a failed insert is logged as a
//! warning and never aborts or retries the calling pipeline stage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::model::ApiCostEntry;
use crate::store::CostStore;

/// Token counts reported by the external API for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// USD prices per 1M tokens: (model, input, output). Unknown models cost 0
/// (fail-open: an unpriced model never blocks tracking).
const MODEL_PRICES: &[(&str, f64, f64)] = &[
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4o-mini", 0.15, 0.60),
    ("text-embedding-3-small", 0.02, 0.0),
    ("text-embedding-3-large", 0.13, 0.0),
];

/// Compute the USD cost of a call from the static price table.
pub fn cost_usd(model: &str, usage: TokenUsage) -> f64 {
    let Some((_, input_price, output_price)) =
        MODEL_PRICES.iter().find(|(name, _, _)| *name == model)
    else {
        return 0.0;
    };
    f64::from(usage.input_tokens) * input_price / 1_000_000.0
        + f64::from(usage.output_tokens) * output_price / 1_000_000.0
}

/// Cost-ledger collaborator.
#[async_trait]
pub trait CostTracker: Send + Sync {
    /// Record one API call. Must never fail the caller.
    async fn log_usage(&self, operation: &str, model: &str, usage: TokenUsage);
}

/// Tracker that appends entries to a [`CostStore`].
///
/// The insert is spawned so slow or failing ledger writes cannot stall the
/// extraction or embedding path.
pub struct StoreCostTracker {
    store: Arc<dyn CostStore>,
}

impl StoreCostTracker {
    pub fn new(store: Arc<dyn CostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CostTracker for StoreCostTracker {
    async fn log_usage(&self, operation: &str, model: &str, usage: TokenUsage) {
        let entry = ApiCostEntry {
            created_at: Utc::now(),
            operation: operation.to_string(),
            model: model.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_usd: cost_usd(model, usage),
        };

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.insert_cost(&entry).await {
                warn!(
                    operation = %entry.operation,
                    model = %entry.model,
                    error = %e,
                    "failed to record api cost entry"
                );
            }
        });
    }
}

/// Log usage through an optional tracker; a `None` tracker is a no-op.
pub async fn track(
    tracker: &Option<Arc<dyn CostTracker>>,
    operation: &str,
    model: &str,
    usage: TokenUsage,
) {
    if let Some(tracker) = tracker {
        tracker.log_usage(operation, model, usage).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_costs_are_computed_from_the_table() {
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
        };
        let cost = cost_usd("gpt-4o", usage);
        assert!((cost - 12.50).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_costs_zero() {
        let usage = TokenUsage {
            input_tokens: 50_000,
            output_tokens: 50_000,
        };
        assert_eq!(cost_usd("some-future-model", usage), 0.0);
    }

    #[test]
    fn embedding_models_have_no_output_price() {
        let usage = TokenUsage {
            input_tokens: 2_000_000,
            output_tokens: 999,
        };
        let cost = cost_usd("text-embedding-3-small", usage);
        assert!((cost - 0.04).abs() < 1e-9);
    }
}
