use shannon_types::{ShannonResult, Subtask};

use crate::common::{PatternContext, PatternOutput};

/// §4.F.2 Sequential: subtasks run one after another, each receiving a
/// short summary of everything completed so far so later agents can build
/// on prior output without re-reading the full transcript.
pub async fn run(ctx: &PatternContext, subtasks: &[Subtask], attempt: u32) -> ShannonResult<PatternOutput> {
    let mut steps = Vec::with_capacity(subtasks.len());
    let mut prior_summary = String::new();

    for subtask in subtasks {
        let prompt = if prior_summary.is_empty() {
            subtask.description.clone()
        } else {
            format!("Prior results so far:\n{prior_summary}\n\nNow: {}", subtask.description)
        };

        let result = ctx
            .run_agent_step(&subtask.id, &prompt, Some(&subtask.suggested_tools), attempt)
            .await?;

        if result.error.is_some() && ctx.options.fail_fast {
            steps.push(result);
            break;
        }

        prior_summary.push_str(&format!("- [{}] {}\n", subtask.id, truncate(&result.response, 280)));
        steps.push(result);
    }

    let response = steps
        .last()
        .map(|s| s.response.clone())
        .unwrap_or_default();

    Ok(PatternOutput { response, steps, confidence: None })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stub_context, stub_subtask};

    #[tokio::test]
    async fn passes_prior_summary_into_next_prompt() {
        let ctx = stub_context();
        let subtasks = vec![stub_subtask("a"), stub_subtask("b")];
        let out = run(&ctx, &subtasks, 1).await.unwrap();
        assert_eq!(out.steps.len(), 2);
        assert!(out.steps[1].response.contains("Prior results"));
    }
}
