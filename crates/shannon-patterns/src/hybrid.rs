use std::collections::HashMap;
use std::time::Duration;

use shannon_types::{topological_order, ShannonResult, Subtask};

use crate::common::{PatternContext, PatternOutput};
use crate::parallel::{self, ParallelConfig};

/// §4.F.3 Hybrid (DAG): default timeout a producer's consumers wait for a
/// topic before giving up.
pub const DEFAULT_P2P_TIMEOUT: Duration = Duration::from_secs(360);

/// In-memory workspace mediating `produces`/`consumes` semantic-topic
/// hand-off between subtasks in the same plan (§4.F.3 P2P coordination).
/// A real deployment would back this with the durable workspace the engine
/// exposes; tests and single-workflow runs use this in-process version.
#[derive(Default)]
pub struct Workspace {
    topics: tokio::sync::Mutex<HashMap<String, String>>,
    notify: tokio::sync::Notify,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace::default()
    }

    pub async fn produce(&self, topic: &str, content: String) {
        self.topics.lock().await.insert(topic.to_string(), content);
        self.notify.notify_waiters();
    }

    /// Waits up to `timeout` for every topic in `topics` to be produced;
    /// returns whatever was available when the wait ended.
    pub async fn consume_all(&self, topics: &[String], timeout: Duration) -> HashMap<String, String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let map = self.topics.lock().await;
                if topics.iter().all(|t| map.contains_key(t)) {
                    return topics.iter().filter_map(|t| map.get(t).map(|v| (t.clone(), v.clone()))).collect();
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                let map = self.topics.lock().await;
                return topics.iter().filter_map(|t| map.get(t).map(|v| (t.clone(), v.clone()))).collect();
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }
}

/// Topologically sorts subtasks by `depends_on`, runs each level with
/// Parallel, and — for any subtask declaring `produces`/`consumes` — routes
/// content through `workspace` before the dependent level starts. Returns
/// `CyclicPlan` via `topological_order` when the plan is not a DAG.
pub async fn run(
    ctx: &PatternContext,
    subtasks: &[Subtask],
    parallel_config: &ParallelConfig,
    workspace: &Workspace,
    p2p_timeout: Duration,
    attempt: u32,
) -> ShannonResult<PatternOutput> {
    let levels = topological_order(subtasks)?;
    let by_id: HashMap<&str, &Subtask> = subtasks.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut all_steps = Vec::new();
    for level in levels {
        let level_subtasks: Vec<Subtask> = level.iter().filter_map(|id| by_id.get(id.as_str())).map(|s| (*s).clone()).collect();

        let needed: Vec<String> = level_subtasks.iter().flat_map(|s| s.consumes.clone()).collect();
        if !needed.is_empty() {
            let fetched = workspace.consume_all(&needed, p2p_timeout).await;
            for (topic, content) in fetched {
                ctx.emit(shannon_types::EventType::WorkspaceUpdated, "hybrid", &format!("{topic}: {content}"))
                    .await;
            }
        }

        let level_out = parallel::run(ctx, &level_subtasks, parallel_config, attempt).await?;
        for (subtask, step) in level_subtasks.iter().zip(level_out.steps.iter()) {
            for topic in &subtask.produces {
                workspace.produce(topic, step.response.clone()).await;
            }
        }
        all_steps.extend(level_out.steps);

        if ctx.options.fail_fast && all_steps.iter().any(|s| s.error.is_some()) {
            break;
        }
    }

    let response = all_steps
        .iter()
        .filter(|s| s.error.is_none())
        .map(|s| s.response.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(PatternOutput { response, steps: all_steps, confidence: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_context;

    #[tokio::test]
    async fn runs_levels_in_dependency_order() {
        let ctx = stub_context();
        let subtasks = vec![
            Subtask {
                id: "a".into(),
                description: "root".into(),
                depends_on: vec![],
                suggested_tools: vec![],
                tool_parameters: None,
                produces: vec![],
                consumes: vec![],
            },
            Subtask {
                id: "b".into(),
                description: "child".into(),
                depends_on: vec!["a".into()],
                suggested_tools: vec![],
                tool_parameters: None,
                produces: vec![],
                consumes: vec![],
            },
        ];
        let workspace = Workspace::new();
        let out = run(&ctx, &subtasks, &ParallelConfig::default(), &workspace, DEFAULT_P2P_TIMEOUT, 1)
            .await
            .unwrap();
        assert_eq!(out.steps.len(), 2);
    }

    #[tokio::test]
    async fn cyclic_plan_is_rejected() {
        let ctx = stub_context();
        let subtasks = vec![
            Subtask {
                id: "a".into(),
                description: "a".into(),
                depends_on: vec!["b".into()],
                suggested_tools: vec![],
                tool_parameters: None,
                produces: vec![],
                consumes: vec![],
            },
            Subtask {
                id: "b".into(),
                description: "b".into(),
                depends_on: vec!["a".into()],
                suggested_tools: vec![],
                tool_parameters: None,
                produces: vec![],
                consumes: vec![],
            },
        ];
        let workspace = Workspace::new();
        let result = run(&ctx, &subtasks, &ParallelConfig::default(), &workspace, DEFAULT_P2P_TIMEOUT, 1).await;
        assert!(matches!(result, Err(shannon_types::ShannonError::CyclicPlan)));
    }
}
