use shannon_types::ShannonResult;

use crate::common::{PatternContext, PatternOutput};

/// §4.F.4 ReAct: `max_iterations` is clamped to the spec's 2-8 range.
#[derive(Debug, Clone)]
pub struct ReactConfig {
    pub max_iterations: u32,
    pub tools: Vec<String>,
}

impl Default for ReactConfig {
    fn default() -> Self {
        ReactConfig { max_iterations: 5, tools: Vec::new() }
    }
}

const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";

/// Loops (reason -> act -> observe). Each iteration makes a reasoner call;
/// if the reasoner's output isn't a final answer, it makes an action call
/// (optionally invoking a tool) and a synthesizer call to fold the
/// observation back in. All three are recorded as separate agent steps;
/// when the reasoner chose no tool, the action/synthesizer calls are
/// skipped for that iteration.
pub async fn run(ctx: &PatternContext, query: &str, config: &ReactConfig, attempt: u32) -> ShannonResult<PatternOutput> {
    let max_iterations = config.max_iterations.clamp(2, 8);
    let mut steps = Vec::new();
    let mut transcript = format!("Question: {query}");
    let mut final_answer = None;

    for iteration in 0..max_iterations {
        let reasoner_id = format!("reasoner-{iteration}");
        let reasoner_prompt = format!(
            "{transcript}\n\nThink step by step. If you can answer now, reply starting with '{FINAL_ANSWER_MARKER}'. \
             Otherwise state which tool (of {:?}) to use and why.",
            config.tools
        );
        let reasoner = ctx.run_agent_step(&reasoner_id, &reasoner_prompt, None, attempt).await?;
        transcript.push_str(&format!("\nThought {iteration}: {}", reasoner.response));

        if reasoner.error.is_some() || reasoner.response.contains(FINAL_ANSWER_MARKER) {
            final_answer = Some(reasoner.response.clone());
            steps.push(reasoner);
            break;
        }
        steps.push(reasoner);

        if config.tools.is_empty() {
            continue;
        }

        let action_id = format!("action-{iteration}");
        let action_prompt = format!("{transcript}\n\nChoose and describe the tool call to make.");
        let action = ctx.run_agent_step(&action_id, &action_prompt, Some(&config.tools), attempt).await?;
        transcript.push_str(&format!("\nAction {iteration}: {}", action.response));
        steps.push(action);

        let observation = if let Some(tool_name) = config.tools.first() {
            ctx.run_tool(&action_id, tool_name, serde_json::json!({ "query": query })).await
        } else {
            continue;
        };
        transcript.push_str(&format!(
            "\nObservation {iteration}: {}",
            observation.output.clone().unwrap_or_default()
        ));

        let synth_id = format!("synthesizer-{iteration}");
        let synth_prompt = format!("{transcript}\n\nIncorporate the observation and continue reasoning.");
        let synth = ctx.run_agent_step(&synth_id, &synth_prompt, None, attempt).await?;
        transcript.push_str(&format!("\nSynthesis {iteration}: {}", synth.response));
        steps.push(synth);
    }

    let response = final_answer.unwrap_or_else(|| transcript.clone());
    Ok(PatternOutput { response, steps, confidence: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_context;

    #[tokio::test]
    async fn stops_within_iteration_cap() {
        let ctx = stub_context();
        let config = ReactConfig { max_iterations: 3, tools: vec![] };
        let out = run(&ctx, "What is 2+2?", &config, 1).await.unwrap();
        assert!(out.steps.len() <= 3);
    }

    #[tokio::test]
    async fn clamps_iteration_count_to_spec_range() {
        let ctx = stub_context();
        let config = ReactConfig { max_iterations: 100, tools: vec![] };
        let out = run(&ctx, "q", &config, 1).await.unwrap();
        assert!(out.steps.len() <= 8);
    }
}
