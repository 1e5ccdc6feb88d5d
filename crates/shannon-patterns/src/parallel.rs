use shannon_types::{Subtask, ShannonResult};
use tokio::sync::Semaphore;
use std::sync::Arc;

use crate::common::{PatternContext, PatternOutput};

/// Config for §4.F.1 Parallel: bounded concurrent fan-out, order-preserving
/// collection, and a fail-fast switch shared with `PatternOptions::fail_fast`.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub max_concurrent_agents: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig { max_concurrent_agents: 5 }
    }
}

/// Runs every subtask concurrently, bounded by a semaphore, and collects
/// results in the original subtask order regardless of completion order.
/// `max_concurrent_agents=1` degenerates to sequential execution for a
/// dependency-free plan, matching the Sequential pattern's ordering.
pub async fn run(
    ctx: &PatternContext,
    subtasks: &[Subtask],
    config: &ParallelConfig,
    attempt: u32,
) -> ShannonResult<PatternOutput> {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_agents.max(1)));
    let mut handles = Vec::with_capacity(subtasks.len());

    for subtask in subtasks {
        let semaphore = semaphore.clone();
        let ctx = ctx.clone();
        let subtask = subtask.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            ctx.run_agent_step(&subtask.id, &subtask.description, Some(&subtask.suggested_tools), attempt)
                .await
        }));
    }

    let mut steps = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle.await.expect("agent step task panicked")?;
        let failed = result.error.is_some();
        steps.push(result);
        if failed && ctx.options.fail_fast {
            break;
        }
    }

    let response = steps
        .iter()
        .filter(|s| s.error.is_none())
        .map(|s| s.response.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(PatternOutput { response, steps, confidence: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stub_context, stub_subtask};

    #[tokio::test]
    async fn preserves_input_order_regardless_of_completion_order() {
        let ctx = stub_context();
        let subtasks = vec![stub_subtask("a"), stub_subtask("b"), stub_subtask("c")];
        let out = run(&ctx, &subtasks, &ParallelConfig::default(), 1).await.unwrap();
        let ids: Vec<_> = out.steps.iter().map(|s| s.agent_id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn max_concurrency_one_behaves_like_sequential_ordering() {
        let ctx = stub_context();
        let subtasks = vec![stub_subtask("a"), stub_subtask("b")];
        let config = ParallelConfig { max_concurrent_agents: 1 };
        let out = run(&ctx, &subtasks, &config, 1).await.unwrap();
        assert_eq!(out.steps.len(), 2);
    }
}
