use serde_json::Value;
use shannon_patterns::PatternOutput;
use shannon_types::AgentExecutionResult;

/// A strategy's result: the pattern-level result plus strategy-specific
/// metadata (citation counts, confidence bands, gap-filling iterations)
/// that the gateway surfaces via `Get`'s `metadata` field (§6.1).
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub response: String,
    pub steps: Vec<AgentExecutionResult>,
    pub confidence: Option<f64>,
    pub metadata: Value,
}

impl From<PatternOutput> for StrategyOutput {
    fn from(out: PatternOutput) -> Self {
        StrategyOutput {
            response: out.response,
            steps: out.steps,
            confidence: out.confidence,
            metadata: serde_json::json!({}),
        }
    }
}

impl StrategyOutput {
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
