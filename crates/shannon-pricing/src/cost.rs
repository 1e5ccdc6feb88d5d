use std::sync::{Arc, RwLock};

use shannon_types::Money;

use crate::provider::{detect_provider, Provider};
use crate::table::PricingTable;

/// Holds a hot-reloadable pricing snapshot. `reload` swaps the whole table
/// atomically; `cost_for_split` never performs I/O and never blocks on a
/// writer for long (the lock is held only to clone the `Arc`).
#[derive(Clone)]
pub struct PricingConfig {
    table: Arc<RwLock<Arc<PricingTable>>>,
}

impl PricingConfig {
    pub fn new(table: PricingTable) -> Self {
        PricingConfig {
            table: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    pub fn reload(&self, table: PricingTable) {
        let mut guard = self.table.write().expect("pricing table lock poisoned");
        *guard = Arc::new(table);
    }

    fn snapshot(&self) -> Arc<PricingTable> {
        self.table.read().expect("pricing table lock poisoned").clone()
    }

    /// `cost_for_split(model, in_tok, out_tok) -> usd` (§4.A). Pure given the
    /// current snapshot; increments `pricing_fallback_total{reason}` when the
    /// model is unknown.
    pub fn cost_for_split(&self, model: &str, in_tok: u64, out_tok: u64) -> Money {
        let provider = detect_provider(model);
        self.cost_for_split_with_provider(provider, model, in_tok, out_tok)
    }

    pub fn cost_for_split_with_provider(
        &self,
        provider: Provider,
        model: &str,
        in_tok: u64,
        out_tok: u64,
    ) -> Money {
        let snapshot = self.snapshot();
        let (pricing, fallback) = snapshot.resolve(provider, model);
        if let Some(reason) = fallback {
            tracing::debug!(
                counter = "pricing_fallback_total",
                reason = reason.as_str(),
                model,
                provider = provider.as_str(),
                "pricing fallback"
            );
        }
        let input_cost = (in_tok as f64 / 1000.0) * pricing.input_per_1k;
        let output_cost = (out_tok as f64 / 1000.0) * pricing.output_per_1k;
        Money::from_usd(input_cost + output_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ModelPricing;

    fn config() -> PricingConfig {
        let table = PricingTable::builder()
            .model(
                Provider::Anthropic,
                "claude-3-5-sonnet",
                ModelPricing {
                    input_per_1k: 0.003,
                    output_per_1k: 0.015,
                },
            )
            .provider_default(
                Provider::OpenAi,
                ModelPricing {
                    input_per_1k: 0.0015,
                    output_per_1k: 0.002,
                },
            )
            .build();
        PricingConfig::new(table)
    }

    #[test]
    fn exact_model_match() {
        let cfg = config();
        let cost = cfg.cost_for_split("claude-3-5-sonnet", 1000, 1000);
        assert_eq!(cost, Money::from_usd(0.003 + 0.015));
    }

    #[test]
    fn unknown_model_falls_back_to_provider_default() {
        let cfg = config();
        let cost = cfg.cost_for_split("gpt-4o-some-future-snapshot", 1000, 0);
        assert_eq!(cost, Money::from_usd(0.0015));
    }

    #[test]
    fn unknown_provider_falls_back_to_global_default() {
        let cfg = config();
        let cost = cfg.cost_for_split("totally-unknown-model", 1000, 1000);
        assert_eq!(cost, Money::from_usd(0.001 + 0.002));
    }

    #[test]
    fn reload_swaps_atomically() {
        let cfg = config();
        cfg.reload(
            PricingTable::builder()
                .model(
                    Provider::Anthropic,
                    "claude-3-5-sonnet",
                    ModelPricing {
                        input_per_1k: 0.0,
                        output_per_1k: 0.0,
                    },
                )
                .build(),
        );
        assert_eq!(cfg.cost_for_split("claude-3-5-sonnet", 1000, 1000), Money::ZERO);
    }
}
