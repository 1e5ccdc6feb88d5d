use serde_json::json;
use shannon_patterns::{react, reflection, PatternContext, ReactConfig, ReflectionConfig};
use shannon_types::ShannonResult;

use crate::common::StrategyOutput;

#[derive(Debug, Clone, Default)]
pub struct ReactStrategyConfig {
    pub react: ReactConfig,
    /// §4.G "optionally wraps in Reflection".
    pub wrap_in_reflection: bool,
}

/// §4.G ReAct strategy: runs one ReAct loop directly over the query.
pub async fn run(ctx: &PatternContext, query: &str, config: &ReactStrategyConfig, attempt: u32) -> ShannonResult<StrategyOutput> {
    let out = react::run(ctx, query, &config.react, attempt).await?;
    let mut steps = out.steps;
    let mut response = out.response;

    if config.wrap_in_reflection {
        let reflection = reflection::run(ctx, query, &ReflectionConfig::default(), attempt).await?;
        response = reflection.response;
        steps.extend(reflection.steps);
    }

    Ok(StrategyOutput { response, steps, confidence: None, metadata: json!({"strategy": "react"}) })
}

#[cfg(test)]
mod tests {
    use shannon_patterns::test_support::stub_context;

    use super::*;

    #[tokio::test]
    async fn runs_react_loop() {
        let ctx = stub_context();
        let out = run(&ctx, "weather in paris", &ReactStrategyConfig::default(), 1).await.unwrap();
        assert!(!out.steps.is_empty());
    }
}
