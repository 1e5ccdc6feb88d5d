use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shannon_types::{ModelTier, WorkflowMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStrategy {
    Quick,
    Standard,
    Deep,
    Academic,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchControls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_strategy: Option<ResearchStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_agents: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_verification: Option<bool>,
}

/// The `Submit` request body (§6.1). Wire-shape is transport-agnostic: the
/// gateway decodes this from JSON over HTTP or from the equivalent gRPC
/// message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<WorkflowMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_tier: Option<ModelTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_override: Option<String>,
    #[serde(default)]
    pub force_research: bool,
    #[serde(default)]
    pub disable_ai: bool,
    #[serde(default, flatten)]
    pub research: ResearchControls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitValidationError {
    /// An enum-typed field held a value that did not parse into that enum.
    UnknownEnumValue { field: &'static str, value: String },
    /// `disable_ai=true` combined with any model/provider/tier override.
    DisableAiWithOverride,
    EmptyQuery,
}

impl std::fmt::Display for SubmitValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitValidationError::UnknownEnumValue { field, value } => {
                write!(f, "unknown value {value:?} for field {field}")
            }
            SubmitValidationError::DisableAiWithOverride => write!(
                f,
                "disable_ai=true cannot be combined with a model/provider/tier override"
            ),
            SubmitValidationError::EmptyQuery => write!(f, "query must not be empty"),
        }
    }
}

impl std::error::Error for SubmitValidationError {}

impl SubmitRequest {
    /// Validation per §6.1: this must run before the router ever sees the
    /// request — `disable_ai=true` with any override must not reach the
    /// router (§4.H tie-breaks).
    pub fn validate(&self) -> Result<(), SubmitValidationError> {
        if self.query.trim().is_empty() {
            return Err(SubmitValidationError::EmptyQuery);
        }
        if self.disable_ai
            && (self.model_override.is_some()
                || self.provider_override.is_some()
                || self.model_tier.is_some())
        {
            return Err(SubmitValidationError::DisableAiWithOverride);
        }
        Ok(())
    }

    /// Model-tier collision between the top-level field and `context`:
    /// top-level wins (§6.1).
    pub fn effective_model_tier(&self) -> Option<ModelTier> {
        if let Some(tier) = self.model_tier {
            return Some(tier);
        }
        self.context
            .get("model_tier")
            .and_then(|v| v.as_str())
            .and_then(|s| match s {
                "small" => Some(ModelTier::Small),
                "medium" => Some(ModelTier::Medium),
                "large" => Some(ModelTier::Large),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SubmitRequest {
        SubmitRequest {
            query: "hello".into(),
            session_id: None,
            context: HashMap::new(),
            mode: None,
            model_tier: None,
            model_override: None,
            provider_override: None,
            force_research: false,
            disable_ai: false,
            research: ResearchControls::default(),
            cognitive_strategy: None,
        }
    }

    #[test]
    fn rejects_disable_ai_with_override() {
        let mut req = base();
        req.disable_ai = true;
        req.model_override = Some("gpt-4".into());
        assert_eq!(
            req.validate(),
            Err(SubmitValidationError::DisableAiWithOverride)
        );
    }

    #[test]
    fn top_level_tier_wins_over_context() {
        let mut req = base();
        req.model_tier = Some(ModelTier::Large);
        req.context
            .insert("model_tier".into(), Value::String("small".into()));
        assert_eq!(req.effective_model_tier(), Some(ModelTier::Large));
    }

    #[test]
    fn falls_back_to_context_tier() {
        let mut req = base();
        req.context
            .insert("model_tier".into(), Value::String("medium".into()));
        assert_eq!(req.effective_model_tier(), Some(ModelTier::Medium));
    }
}
