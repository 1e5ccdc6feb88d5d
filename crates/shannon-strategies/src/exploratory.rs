use serde_json::json;
use shannon_patterns::{debate, reflection, tot, DebateConfig, PatternContext, ReflectionConfig, TreeOfThoughtsConfig};
use shannon_types::ShannonResult;

use crate::common::StrategyOutput;

#[derive(Debug, Clone)]
pub struct ExploratoryConfig {
    pub tot: TreeOfThoughtsConfig,
    pub debate: DebateConfig,
    /// Below this, the ToT result is treated as low-confidence and a Debate
    /// pass runs as a fallback before the final Reflection synthesis.
    pub confidence_threshold: f64,
}

impl Default for ExploratoryConfig {
    fn default() -> Self {
        ExploratoryConfig {
            tot: TreeOfThoughtsConfig::default(),
            debate: DebateConfig::default(),
            confidence_threshold: 0.5,
        }
    }
}

/// §4.G Exploratory: Tree-of-Thoughts, falling back to Debate when the
/// ToT result reads as low-confidence, finalized by Reflection. ToT's
/// pattern-level `confidence` is always `None` (its branch scoring is an
/// internal pruning signal, not carried out, per its own stand-in note) so
/// this strategy estimates confidence itself from the winning branch's
/// response — a short or empty result reads as low-confidence.
pub async fn run(ctx: &PatternContext, query: &str, config: &ExploratoryConfig, attempt: u32) -> ShannonResult<StrategyOutput> {
    let mut steps = Vec::new();

    let explored = tot::run(ctx, query, &config.tot, attempt).await?;
    let confidence = estimate_confidence(&explored.response);
    steps.extend(explored.steps.clone());

    let mut working_response = explored.response.clone();
    let mut used_debate = false;

    if confidence < config.confidence_threshold {
        let debated = debate::run(
            ctx,
            &format!("{query}\n\nExploratory candidate answer: {working_response}\n\nDebate whether this holds up."),
            &config.debate,
            attempt,
        )
        .await?;
        working_response = debated.response;
        steps.extend(debated.steps);
        used_debate = true;
    }

    let final_pass = reflection::run(
        ctx,
        &format!("{query}\n\nWorking answer: {working_response}"),
        &ReflectionConfig::default(),
        attempt,
    )
    .await?;
    steps.extend(final_pass.steps);

    Ok(StrategyOutput {
        response: final_pass.response,
        steps,
        confidence: Some(confidence),
        metadata: json!({"strategy": "exploratory", "used_debate_fallback": used_debate}),
    })
}

fn estimate_confidence(response: &str) -> f64 {
    if response.trim().is_empty() {
        0.0
    } else if response.len() < 40 {
        0.3
    } else {
        0.7
    }
}

#[cfg(test)]
mod tests {
    use shannon_patterns::test_support::stub_context;

    use super::*;

    #[tokio::test]
    async fn low_confidence_falls_back_to_debate() {
        let ctx = stub_context();
        let mut config = ExploratoryConfig::default();
        config.confidence_threshold = 1.0; // force fallback regardless of estimate
        let out = run(&ctx, "q", &config, 1).await.unwrap();
        assert_eq!(out.metadata["used_debate_fallback"], true);
    }

    #[tokio::test]
    async fn high_threshold_zero_skips_debate() {
        let ctx = stub_context();
        let mut config = ExploratoryConfig::default();
        config.confidence_threshold = -1.0; // never triggers
        let out = run(&ctx, "q", &config, 1).await.unwrap();
        assert_eq!(out.metadata["used_debate_fallback"], false);
    }
}
