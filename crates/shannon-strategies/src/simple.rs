use serde_json::json;
use shannon_patterns::PatternContext;
use shannon_types::ShannonResult;

use crate::common::StrategyOutput;

/// §4.G Simple: one agent call, always records its own step.
pub async fn run(ctx: &PatternContext, query: &str, attempt: u32) -> ShannonResult<StrategyOutput> {
    let result = ctx.run_agent_step("simple-agent", query, None, attempt).await?;
    let response = result.response.clone();
    Ok(StrategyOutput {
        response,
        steps: vec![result],
        confidence: None,
        metadata: json!({"strategy": "simple"}),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_patterns::test_support::stub_context;

    #[tokio::test]
    async fn records_exactly_one_step() {
        let ctx = stub_context();
        let out = run(&ctx, "what is 5+5?", 1).await.unwrap();
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.steps[0].agent_id, "simple-agent");
    }
}
