use std::time::Duration;

use serde_json::json;
use shannon_patterns::{hybrid, parallel, reflection, ParallelConfig, PatternContext, ReflectionConfig, Workspace};
use shannon_router::StrategyKind;
use shannon_types::{Plan, ShannonResult};

use crate::common::StrategyOutput;

#[derive(Debug, Clone)]
pub struct DagConfig {
    pub reflection_threshold: f64,
    pub parallel: ParallelConfig,
    pub p2p_timeout: Duration,
}

impl Default for DagConfig {
    fn default() -> Self {
        DagConfig {
            reflection_threshold: 0.5,
            parallel: ParallelConfig::default(),
            p2p_timeout: shannon_patterns::DEFAULT_P2P_TIMEOUT,
        }
    }
}

/// §4.G DAG: the router has already decomposed `plan`; this picks
/// Parallel vs Hybrid by the plan's own dependency/P2P shape (a strict
/// `depends_on` chain or any `produces`/`consumes` coordination runs
/// through Hybrid's topological levels, which serializes a chain the same
/// way Sequential would; an independent subtask set runs fully concurrent),
/// unless the router already forced Hybrid via `route_hint` (Complex /
/// Supervisor mode). A Reflection pass follows when `complexity` clears
/// `reflection_threshold`.
pub async fn run(
    ctx: &PatternContext,
    query: &str,
    plan: &Plan,
    route_hint: StrategyKind,
    config: &DagConfig,
    attempt: u32,
) -> ShannonResult<StrategyOutput> {
    let use_hybrid = route_hint == StrategyKind::DagHybrid
        || plan.has_p2p_coordination()
        || plan.subtasks.iter().any(|s| !s.depends_on.is_empty());

    let out = if use_hybrid {
        let workspace = Workspace::new();
        hybrid::run(ctx, &plan.subtasks, &config.parallel, &workspace, config.p2p_timeout, attempt).await?
    } else {
        parallel::run(ctx, &plan.subtasks, &config.parallel, attempt).await?
    };

    let mut steps = out.steps;
    let mut response = out.response;
    let mut reflected = false;

    if plan.complexity >= config.reflection_threshold {
        let reflection = reflection::run(ctx, query, &ReflectionConfig::default(), attempt).await?;
        response = reflection.response;
        steps.extend(reflection.steps);
        reflected = true;
    }

    Ok(StrategyOutput {
        response,
        steps,
        confidence: None,
        metadata: json!({"strategy": "dag", "routed_via": if use_hybrid { "hybrid" } else { "parallel" }, "reflected": reflected}),
    })
}

#[cfg(test)]
mod tests {
    use shannon_patterns::test_support::{stub_context, stub_subtask};

    use super::*;

    #[tokio::test]
    async fn independent_subtasks_route_to_parallel() {
        let ctx = stub_context();
        let plan = Plan { subtasks: vec![stub_subtask("a"), stub_subtask("b")], complexity: 0.2 };
        let out = run(&ctx, "q", &plan, StrategyKind::DagParallel, &DagConfig::default(), 1).await.unwrap();
        assert_eq!(out.metadata["routed_via"], "parallel");
        assert_eq!(out.steps.len(), 2);
    }

    #[tokio::test]
    async fn high_complexity_adds_reflection_steps() {
        let ctx = stub_context();
        let plan = Plan { subtasks: vec![stub_subtask("a")], complexity: 0.9 };
        let out = run(&ctx, "q", &plan, StrategyKind::DagParallel, &DagConfig::default(), 1).await.unwrap();
        assert!(out.steps.len() > 1);
        assert_eq!(out.metadata["reflected"], true);
    }

    #[tokio::test]
    async fn chained_subtasks_route_to_hybrid() {
        let ctx = stub_context();
        let mut b = stub_subtask("b");
        b.depends_on = vec!["a".to_string()];
        let plan = Plan { subtasks: vec![stub_subtask("a"), b], complexity: 0.1 };
        let out = run(&ctx, "q", &plan, StrategyKind::DagParallel, &DagConfig::default(), 1).await.unwrap();
        assert_eq!(out.metadata["routed_via"], "hybrid");
    }
}
