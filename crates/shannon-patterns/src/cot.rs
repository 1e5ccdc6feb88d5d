use shannon_types::ShannonResult;

use crate::common::{PatternContext, PatternOutput};

/// §4.F.5 Chain-of-Thought.
#[derive(Debug, Clone, Default)]
pub struct ChainOfThoughtConfig {
    pub clarify: bool,
}

/// Single reasoning step, or two when `clarify` asks a clarifying question
/// before the real reasoning pass. Carries a scalar `confidence` parsed
/// from the reasoner's self-reported score (defaults to 0.5 when absent or
/// unparsable, never a hard failure).
pub async fn run(
    ctx: &PatternContext,
    query: &str,
    config: &ChainOfThoughtConfig,
    attempt: u32,
) -> ShannonResult<PatternOutput> {
    let mut steps = Vec::new();
    let mut prompt = format!(
        "{query}\n\nThink step by step, then answer. End with a line 'Confidence: <0.0-1.0>'."
    );

    if config.clarify {
        let clarify = ctx
            .run_agent_step("clarify", &format!("{query}\n\nAsk one clarifying question if needed, else reply 'none'."), None, attempt)
            .await?;
        if !clarify.response.to_lowercase().contains("none") {
            prompt = format!("{query}\n\nClarification: {}\n\nNow think step by step and answer. End with 'Confidence: <0.0-1.0>'.", clarify.response);
        }
        steps.push(clarify);
    }

    let reasoning = ctx.run_agent_step("reasoner", &prompt, None, attempt).await?;
    let confidence = parse_confidence(&reasoning.response);
    let response = reasoning.response.clone();
    steps.push(reasoning);

    Ok(PatternOutput { response, steps, confidence: Some(confidence) })
}

fn parse_confidence(text: &str) -> f64 {
    text.lines()
        .rev()
        .find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower.strip_prefix("confidence:").and_then(|rest| rest.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.5)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_context;

    #[tokio::test]
    async fn defaults_confidence_when_unparsable() {
        let ctx = stub_context();
        let out = run(&ctx, "why is the sky blue?", &ChainOfThoughtConfig::default(), 1).await.unwrap();
        assert_eq!(out.confidence, Some(0.5));
    }

    #[test]
    fn parses_confidence_line() {
        assert!((parse_confidence("reasoning...\nConfidence: 0.9") - 0.9).abs() < 1e-9);
    }
}
