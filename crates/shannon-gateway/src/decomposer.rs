use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shannon_router::Decomposer;
use shannon_types::{AgentExecutor, ModelTier, Plan, ShannonResult, Subtask};

/// Asks the configured `AgentExecutor` to decompose a query into subtasks
/// plus a complexity score (§4.H step 3, §6.3 "always invoked as an
/// activity"). Falls back to a single-subtask plan scaled by query length
/// when the model's response isn't parseable JSON, so a submission never
/// hard-fails on a decomposition format slip.
pub struct AgentDecomposer {
    executor: Arc<dyn AgentExecutor>,
}

impl AgentDecomposer {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        AgentDecomposer { executor }
    }
}

#[derive(Deserialize)]
struct DecomposedSubtask {
    id: String,
    description: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    suggested_tools: Vec<String>,
}

#[derive(Deserialize)]
struct DecomposedPlan {
    subtasks: Vec<DecomposedSubtask>,
    complexity: f64,
}

fn decompose_prompt(query: &str) -> String {
    format!(
        "Break the following request into independent subtasks and rate overall \
         complexity from 0.0 (trivial) to 1.0 (very complex). Respond with JSON only: \
         {{\"subtasks\":[{{\"id\":\"s1\",\"description\":\"...\",\"depends_on\":[],\"suggested_tools\":[]}}],\"complexity\":0.0}}.\n\nRequest: {query}"
    )
}

fn fallback_plan(query: &str) -> Plan {
    let complexity = (query.split_whitespace().count() as f64 / 200.0).min(1.0);
    Plan {
        subtasks: vec![Subtask {
            id: "s1".to_string(),
            description: query.to_string(),
            depends_on: Vec::new(),
            suggested_tools: Vec::new(),
            tool_parameters: None,
            produces: Vec::new(),
            consumes: Vec::new(),
        }],
        complexity,
    }
}

#[async_trait]
impl Decomposer for AgentDecomposer {
    async fn decompose(&self, query: &str, _context: &Value) -> ShannonResult<Plan> {
        let outcome = self.executor.execute(&decompose_prompt(query), None, ModelTier::Small, Some(512)).await?;

        let parsed: Option<DecomposedPlan> = serde_json::from_str(outcome.text.trim())
            .ok()
            .or_else(|| extract_json_object(&outcome.text).and_then(|s| serde_json::from_str(&s).ok()));

        Ok(match parsed {
            Some(plan) if !plan.subtasks.is_empty() => Plan {
                subtasks: plan
                    .subtasks
                    .into_iter()
                    .map(|s| Subtask {
                        id: s.id,
                        description: s.description,
                        depends_on: s.depends_on,
                        suggested_tools: s.suggested_tools,
                        tool_parameters: None,
                        produces: Vec::new(),
                        consumes: Vec::new(),
                    })
                    .collect(),
                complexity: plan.complexity.clamp(0.0, 1.0),
            },
            _ => fallback_plan(query),
        })
    }
}

/// Best-effort extraction of the first top-level `{...}` block, for models
/// that wrap JSON in prose or a code fence despite the prompt.
fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_plan_has_one_subtask() {
        let plan = fallback_plan("what is 5 + 5?");
        assert_eq!(plan.subtasks.len(), 1);
    }

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let text = "Sure, here you go:\n```json\n{\"subtasks\":[],\"complexity\":0.1}\n```\nLet me know.";
        let extracted = extract_json_object(text).unwrap();
        assert!(serde_json::from_str::<DecomposedPlan>(&extracted).is_ok());
    }
}
