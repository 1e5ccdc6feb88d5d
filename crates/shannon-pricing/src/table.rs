use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::provider::Provider;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// A hot-reloadable pricing snapshot. `PricingTable` itself is plain data so
/// swapping it is just replacing an `Arc` (see `PricingConfig::reload`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
    provider_defaults: HashMap<String, ModelPricing>,
    #[serde(default = "default_global_default")]
    global_default: ModelPricing,
}

fn default_global_default() -> ModelPricing {
    ModelPricing {
        input_per_1k: 0.001,
        output_per_1k: 0.002,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingFallbackReason {
    UnknownModel,
    UnknownProviderAndModel,
}

impl PricingFallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingFallbackReason::UnknownModel => "unknown_model",
            PricingFallbackReason::UnknownProviderAndModel => "unknown_provider_and_model",
        }
    }
}

impl PricingTable {
    pub fn builder() -> PricingTableBuilder {
        PricingTableBuilder::default()
    }

    /// Looks up `{provider, model}`; falls back to the provider default,
    /// then the global combined default. Always returns a defined value
    /// (§4.A contract) plus whether — and why — a fallback fired.
    pub fn resolve(
        &self,
        provider: Provider,
        model: &str,
    ) -> (ModelPricing, Option<PricingFallbackReason>) {
        let key = format!("{}:{}", provider.as_str(), model.to_ascii_lowercase());
        if let Some(pricing) = self.models.get(&key) {
            return (*pricing, None);
        }
        if let Some(pricing) = self.provider_defaults.get(provider.as_str()) {
            return (*pricing, Some(PricingFallbackReason::UnknownModel));
        }
        (
            self.global_default,
            Some(PricingFallbackReason::UnknownProviderAndModel),
        )
    }
}

#[derive(Debug, Default)]
pub struct PricingTableBuilder {
    models: HashMap<String, ModelPricing>,
    provider_defaults: HashMap<String, ModelPricing>,
    global_default: Option<ModelPricing>,
}

impl PricingTableBuilder {
    pub fn model(mut self, provider: Provider, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.models
            .insert(format!("{}:{}", provider.as_str(), model.into().to_ascii_lowercase()), pricing);
        self
    }

    pub fn provider_default(mut self, provider: Provider, pricing: ModelPricing) -> Self {
        self.provider_defaults.insert(provider.as_str().to_string(), pricing);
        self
    }

    pub fn global_default(mut self, pricing: ModelPricing) -> Self {
        self.global_default = Some(pricing);
        self
    }

    pub fn build(self) -> PricingTable {
        PricingTable {
            models: self.models,
            provider_defaults: self.provider_defaults,
            global_default: self.global_default.unwrap_or_else(default_global_default),
        }
    }
}
