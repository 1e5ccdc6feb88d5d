use shannon_types::ShannonResult;

use crate::common::{PatternContext, PatternOutput};

/// §4.F.8 Reflection.
#[derive(Debug, Clone)]
pub struct ReflectionConfig {
    pub max_iterations: u32,
    pub quality_threshold: f64,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        ReflectionConfig { max_iterations: 3, quality_threshold: 0.7 }
    }
}

/// Synthesizes an initial answer, evaluates its quality, and re-synthesizes
/// with the evaluator's feedback up to `max_iterations` times while quality
/// stays below `quality_threshold`. Both the initial synthesis and every
/// re-synthesis are recorded as separate agent steps, per spec.
pub async fn run(ctx: &PatternContext, query: &str, config: &ReflectionConfig, attempt: u32) -> ShannonResult<PatternOutput> {
    let mut steps = Vec::new();

    let initial = ctx.run_agent_step("synthesis-0", query, None, attempt).await?;
    let mut current_response = initial.response.clone();
    steps.push(initial);

    for iteration in 1..=config.max_iterations {
        let eval_id = format!("evaluator-{iteration}");
        let eval_prompt = format!(
            "Query: {query}\n\nCandidate answer: {current_response}\n\nScore this answer's quality from 0.0 to 1.0 \
             and give one sentence of feedback. Reply as 'Score: <n>\\nFeedback: <text>'."
        );
        let evaluation = ctx.run_agent_step(&eval_id, &eval_prompt, None, attempt).await?;
        let score = parse_score(&evaluation.response);
        let feedback = parse_feedback(&evaluation.response);
        steps.push(evaluation);

        if score >= config.quality_threshold {
            break;
        }

        let resynth_id = format!("synthesis-{iteration}");
        let resynth_prompt = format!(
            "Query: {query}\n\nPrevious answer: {current_response}\n\nFeedback: {feedback}\n\nProduce an improved answer."
        );
        let resynth = ctx.run_agent_step(&resynth_id, &resynth_prompt, None, attempt).await?;
        current_response = resynth.response.clone();
        steps.push(resynth);
    }

    Ok(PatternOutput { response: current_response, steps, confidence: None })
}

fn parse_score(text: &str) -> f64 {
    text.lines()
        .find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower.strip_prefix("score:").and_then(|rest| rest.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

fn parse_feedback(text: &str) -> String {
    text.lines()
        .find_map(|line| line.to_ascii_lowercase().starts_with("feedback:").then(|| line.to_string()))
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_context;

    #[tokio::test]
    async fn records_initial_and_resynthesis_steps() {
        let ctx = stub_context();
        let config = ReflectionConfig { max_iterations: 2, quality_threshold: 1.1 };
        let out = run(&ctx, "explain recursion", &config, 1).await.unwrap();
        assert!(out.steps.len() >= 3);
    }

    #[test]
    fn parses_score_line() {
        assert!((parse_score("Score: 0.8\nFeedback: good") - 0.8).abs() < 1e-9);
    }
}
