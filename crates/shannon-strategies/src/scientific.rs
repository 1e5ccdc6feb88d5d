use serde_json::json;
use shannon_patterns::{cot, debate, reflection, tot, ChainOfThoughtConfig, DebateConfig, PatternContext, ReflectionConfig, TreeOfThoughtsConfig};
use shannon_types::ShannonResult;

use crate::common::StrategyOutput;

/// §4.G Scientific: CoT (hypothesis) → Debate (test) → ToT (implications) →
/// Reflection (synthesis). Each stage feeds its response as the next
/// stage's topic/query so the transcript accumulates context.
pub async fn run(ctx: &PatternContext, query: &str, attempt: u32) -> ShannonResult<StrategyOutput> {
    let mut steps = Vec::new();

    let hypothesis = cot::run(
        ctx,
        &format!("Propose a testable hypothesis for: {query}"),
        &ChainOfThoughtConfig::default(),
        attempt,
    )
    .await?;
    steps.extend(hypothesis.steps);

    let test = debate::run(
        ctx,
        &format!("Hypothesis: {}\n\nDebate whether the evidence supports it.", hypothesis.response),
        &DebateConfig::default(),
        attempt,
    )
    .await?;
    steps.extend(test.steps);

    let implications = tot::run(
        ctx,
        &format!("Debate outcome: {}\n\nExplore the implications.", test.response),
        &TreeOfThoughtsConfig::default(),
        attempt,
    )
    .await?;
    steps.extend(implications.steps);

    let synthesis = reflection::run(
        ctx,
        &format!("{query}\n\nHypothesis: {}\nDebate: {}\nImplications: {}", hypothesis.response, test.response, implications.response),
        &ReflectionConfig::default(),
        attempt,
    )
    .await?;
    steps.extend(synthesis.steps);

    Ok(StrategyOutput {
        response: synthesis.response,
        steps,
        confidence: hypothesis.confidence,
        metadata: json!({"strategy": "scientific"}),
    })
}

#[cfg(test)]
mod tests {
    use shannon_patterns::test_support::stub_context;

    use super::*;

    #[tokio::test]
    async fn runs_all_four_stages() {
        let ctx = stub_context();
        let out = run(&ctx, "does caffeine improve reaction time?", 1).await.unwrap();
        // CoT (1) + Debate (3 roles x 3 rounds = 9) + ToT (>=1) + Reflection (>=1)
        assert!(out.steps.len() > 10);
    }
}
