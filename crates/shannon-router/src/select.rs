use std::sync::Arc;

use serde_json::{json, Value};
use shannon_streaming::StreamingManager;
use shannon_types::{EventType, Plan, ShannonResult, Subtask, WorkflowMode};

use crate::decompose::Decomposer;

/// The strategy a submission is dispatched to (§4.G names); `DagParallel`,
/// `DagSequential` and `DagHybrid` are the three ways a DAG-shaped plan can
/// be routed depending on its dependency/coordination shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Simple,
    DagParallel,
    DagHybrid,
    ReactStrategy,
    Research,
    Exploratory,
    Scientific,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Simple => "simple",
            StrategyKind::DagParallel => "dag_parallel",
            StrategyKind::DagHybrid => "dag_hybrid",
            StrategyKind::ReactStrategy => "react",
            StrategyKind::Research => "research",
            StrategyKind::Exploratory => "exploratory",
            StrategyKind::Scientific => "scientific",
        }
    }
}

/// Normalized submission inputs the router classifies (§4.H step 1). The
/// gateway is responsible for rejecting a `disable_ai=true` + model-override
/// combination before it ever reaches the router (§4.H tie-breaks, §6.1
/// validation); `route` only asserts that invariant defensively.
#[derive(Debug, Clone)]
pub struct RouterInput {
    pub query: String,
    pub context: Value,
    /// A role preset (§4.H step 2) bypasses decomposition entirely.
    pub role: Option<String>,
    pub mode: Option<WorkflowMode>,
    pub force_research: bool,
    /// `"react" | "exploratory" | "scientific"`, a hint used only when
    /// complexity alone does not already pin a strategy.
    pub cognitive_strategy: Option<String>,
    pub disable_ai: bool,
    pub model_override: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RouterDecision {
    pub strategy: StrategyKind,
    pub plan: Plan,
}

/// Runs the full §4.H algorithm: role bypass, decompose, strategy
/// selection, and the router-level `phase=decompose` recording.
pub async fn route(
    input: RouterInput,
    decomposer: &dyn Decomposer,
    streaming: Option<&Arc<StreamingManager>>,
    workflow_id: &str,
) -> ShannonResult<RouterDecision> {
    debug_assert!(
        !(input.disable_ai && input.model_override.is_some()),
        "disable_ai + model_override must be rejected upstream of the router"
    );

    if let Some(role) = &input.role {
        let plan = Plan {
            subtasks: vec![Subtask {
                id: "role-task".to_string(),
                description: input.query.clone(),
                depends_on: Vec::new(),
                suggested_tools: Vec::new(),
                tool_parameters: None,
                produces: Vec::new(),
                consumes: Vec::new(),
            }],
            complexity: 0.0,
        };
        tracing::debug!(role, "role preset bypasses decomposition");
        return Ok(RouterDecision { strategy: StrategyKind::Simple, plan });
    }

    let plan = decomposer.decompose(&input.query, &input.context).await?;
    record_decompose(streaming, workflow_id, &plan).await;

    // §8 boundary behavior: decomposition returning zero subtasks degrades
    // to Simple rather than dispatching an empty plan to a pattern.
    if plan.subtasks.is_empty() {
        return Ok(RouterDecision { strategy: StrategyKind::Simple, plan });
    }

    let strategy = select_strategy(&input, &plan);
    Ok(RouterDecision { strategy, plan })
}

async fn record_decompose(streaming: Option<&Arc<StreamingManager>>, workflow_id: &str, plan: &Plan) {
    if let Some(streaming) = streaming {
        let payload = json!({
            "phase": "decompose",
            "subtask_count": plan.subtasks.len(),
            "complexity": plan.complexity,
        });
        streaming
            .publish(workflow_id, EventType::Progress, None, Some("phase=decompose".to_string()), Some(payload))
            .await;
    }
}

/// §4.H step 4: explicit `mode` wins outright (also the tie-break against
/// `cognitive_strategy` when both are present); `force_research` wins next;
/// then P2P-coordinated plans go to Hybrid; otherwise selection is by
/// complexity band, with `cognitive_strategy` only breaking the top band.
fn select_strategy(input: &RouterInput, plan: &Plan) -> StrategyKind {
    if let Some(mode) = input.mode {
        return match mode {
            WorkflowMode::Simple => StrategyKind::Simple,
            WorkflowMode::Standard => StrategyKind::DagParallel,
            WorkflowMode::Complex => StrategyKind::DagHybrid,
            WorkflowMode::Supervisor => StrategyKind::DagHybrid,
            WorkflowMode::Research => StrategyKind::Research,
        };
    }

    if input.force_research {
        return StrategyKind::Research;
    }

    if plan.has_p2p_coordination() {
        return StrategyKind::DagHybrid;
    }

    if plan.complexity < 0.3 {
        return StrategyKind::Simple;
    }

    if plan.complexity <= 0.7 {
        return match input.cognitive_strategy.as_deref() {
            Some("react") => StrategyKind::ReactStrategy,
            _ => StrategyKind::DagParallel,
        };
    }

    match input.cognitive_strategy.as_deref() {
        Some("exploratory") => StrategyKind::Exploratory,
        Some("scientific") => StrategyKind::Scientific,
        _ => StrategyKind::DagHybrid,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct StubDecomposer(Plan);

    #[async_trait]
    impl Decomposer for StubDecomposer {
        async fn decompose(&self, _query: &str, _context: &Value) -> ShannonResult<Plan> {
            Ok(self.0.clone())
        }
    }

    fn subtask(id: &str) -> Subtask {
        Subtask {
            id: id.to_string(),
            description: id.to_string(),
            depends_on: Vec::new(),
            suggested_tools: Vec::new(),
            tool_parameters: None,
            produces: Vec::new(),
            consumes: Vec::new(),
        }
    }

    fn base_input() -> RouterInput {
        RouterInput {
            query: "q".to_string(),
            context: json!({}),
            role: None,
            mode: None,
            force_research: false,
            cognitive_strategy: None,
            disable_ai: false,
            model_override: None,
        }
    }

    #[tokio::test]
    async fn empty_decomposition_degrades_to_simple() {
        let decomposer = StubDecomposer(Plan::empty());
        let decision = route(base_input(), &decomposer, None, "wf-1").await.unwrap();
        assert_eq!(decision.strategy, StrategyKind::Simple);
    }

    #[tokio::test]
    async fn role_preset_bypasses_decomposition() {
        let decomposer = StubDecomposer(Plan { subtasks: vec![subtask("a")], complexity: 0.9 });
        let mut input = base_input();
        input.role = Some("reviewer".to_string());
        let decision = route(input, &decomposer, None, "wf-1").await.unwrap();
        assert_eq!(decision.strategy, StrategyKind::Simple);
        assert_eq!(decision.plan.subtasks.len(), 1);
    }

    #[test]
    fn explicit_mode_beats_cognitive_strategy() {
        let mut input = base_input();
        input.mode = Some(WorkflowMode::Simple);
        input.cognitive_strategy = Some("scientific".to_string());
        let plan = Plan { subtasks: vec![subtask("a")], complexity: 0.95 };
        assert_eq!(select_strategy(&input, &plan), StrategyKind::Simple);
    }

    #[test]
    fn force_research_overrides_complexity() {
        let mut input = base_input();
        input.force_research = true;
        let plan = Plan { subtasks: vec![subtask("a")], complexity: 0.1 };
        assert_eq!(select_strategy(&input, &plan), StrategyKind::Research);
    }

    #[test]
    fn p2p_coordination_selects_hybrid() {
        let input = base_input();
        let mut produces_subtask = subtask("a");
        produces_subtask.produces = vec!["draft".to_string()];
        let plan = Plan { subtasks: vec![produces_subtask], complexity: 0.1 };
        assert_eq!(select_strategy(&input, &plan), StrategyKind::DagHybrid);
    }

    #[test]
    fn complexity_bands_select_by_threshold() {
        let input = base_input();
        let low = Plan { subtasks: vec![subtask("a")], complexity: 0.2 };
        let mid = Plan { subtasks: vec![subtask("a")], complexity: 0.5 };
        let high = Plan { subtasks: vec![subtask("a")], complexity: 0.85 };
        assert_eq!(select_strategy(&input, &low), StrategyKind::Simple);
        assert_eq!(select_strategy(&input, &mid), StrategyKind::DagParallel);
        assert_eq!(select_strategy(&input, &high), StrategyKind::DagHybrid);
    }

    #[test]
    fn cognitive_strategy_hint_breaks_top_band() {
        let mut input = base_input();
        input.cognitive_strategy = Some("exploratory".to_string());
        let plan = Plan { subtasks: vec![subtask("a")], complexity: 0.85 };
        assert_eq!(select_strategy(&input, &plan), StrategyKind::Exploratory);
    }

    #[test]
    fn cognitive_strategy_hint_breaks_mid_band_for_react() {
        let mut input = base_input();
        input.cognitive_strategy = Some("react".to_string());
        let plan = Plan { subtasks: vec![subtask("a")], complexity: 0.5 };
        assert_eq!(select_strategy(&input, &plan), StrategyKind::ReactStrategy);
    }
}
