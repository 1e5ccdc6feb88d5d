use std::fmt::Debug;
use std::future::Future;

use shannon_types::ShannonResult;
use uuid::Uuid;

use crate::context::WorkflowContext;
use crate::engine::Engine;
use crate::history::History;

/// Result of replaying one recorded execution (§8.3: "replaying a
/// workflow's recorded history against the current core code produces the
/// same sequence of activity invocations and the same final result; any
/// non-determinism is a test failure").
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub deterministic: bool,
    pub recorded_keys: Vec<String>,
    pub observed_keys: Vec<String>,
    pub divergence: Option<String>,
}

/// Re-runs `workflow_fn` against a replay context seeded from `history` and
/// checks that it asked for the same activities/timers/signals/version
/// gates, in the same order, and reached the same final result — without
/// re-executing a single real side effect, since every lookup in
/// `execute_activity` et al. is satisfied from `history` instead.
pub async fn replay<F, Fut, T>(
    engine: &Engine,
    workflow_id: &str,
    task_id: Uuid,
    history: History,
    expected_result: &T,
    workflow_fn: F,
) -> ShannonResult<ReplayReport>
where
    F: FnOnce(WorkflowContext) -> Fut,
    Fut: Future<Output = ShannonResult<T>>,
    T: PartialEq + Debug,
{
    let recorded_keys = history.recorded_keys();
    let ctx = engine.replay_context(workflow_id, task_id, history);
    let ctx_for_inspection = ctx.clone();

    let result = workflow_fn(ctx).await;
    let observed_keys = ctx_for_inspection.observed_keys().await;

    let divergence = match &result {
        Err(e) => Some(format!("replay failed: {e}")),
        Ok(_) if observed_keys != recorded_keys => Some(format!(
            "activity invocation order diverged: recorded {recorded_keys:?}, observed {observed_keys:?}"
        )),
        Ok(value) if value != expected_result => {
            Some(format!("final result diverged: expected {expected_result:?}, got {value:?}"))
        }
        Ok(_) => None,
    };

    Ok(ReplayReport { deterministic: divergence.is_none(), recorded_keys, observed_keys, divergence })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn two_step_workflow(ctx: WorkflowContext) -> ShannonResult<u32> {
        let a: u32 = ctx.execute_activity("step-a", || async { Ok(1) }).await?;
        let b: u32 = ctx.execute_activity("step-b", || async { Ok(2) }).await?;
        Ok(a + b)
    }

    #[tokio::test]
    async fn replay_of_matching_history_is_deterministic() {
        let engine = Engine::new();
        let task_id = Uuid::new_v4();
        let live = engine.new_context("wf-1", task_id);
        let result = two_step_workflow(live.clone()).await.unwrap();
        let history = live.history_snapshot().await;

        let report = replay(&engine, "wf-1", task_id, history, &result, two_step_workflow).await.unwrap();

        assert!(report.deterministic, "{:?}", report.divergence);
        assert_eq!(report.recorded_keys, report.observed_keys);
    }

    #[tokio::test]
    async fn replay_detects_order_divergence() {
        let engine = Engine::new();
        let task_id = Uuid::new_v4();
        let live = engine.new_context("wf-1", task_id);
        let _ = two_step_workflow(live.clone()).await.unwrap();
        let history = live.history_snapshot().await;

        async fn reordered_workflow(ctx: WorkflowContext) -> ShannonResult<u32> {
            let b: u32 = ctx.execute_activity("step-b", || async { Ok(2) }).await?;
            let a: u32 = ctx.execute_activity("step-a", || async { Ok(1) }).await?;
            Ok(a + b)
        }

        let report = replay(&engine, "wf-1", task_id, history, &3u32, reordered_workflow).await.unwrap();
        assert!(!report.deterministic);
    }
}
