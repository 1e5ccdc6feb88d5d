use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ShannonError;

/// A unit of work derived from decomposition. `depends_on` and
/// `consumes`/`produces` form two independent coordination axes: the former
/// is a hard execution-order dependency (used by Hybrid/DAG topological
/// sort), the latter is semantic-topic P2P coordination (§4.F.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub suggested_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_parameters: Option<Value>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
}

/// A decomposed plan: the subtask set plus the complexity score the router
/// uses for strategy selection (§4.H).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub subtasks: Vec<Subtask>,
    pub complexity: f64,
}

impl Plan {
    pub fn empty() -> Self {
        Plan {
            subtasks: Vec::new(),
            complexity: 0.0,
        }
    }

    pub fn has_p2p_coordination(&self) -> bool {
        self.subtasks
            .iter()
            .any(|s| !s.produces.is_empty() || !s.consumes.is_empty())
    }

    /// Validates the acyclicity invariant and that every `depends_on` id
    /// refers to a sibling in the same plan (§3 Subtask invariant).
    pub fn validate(&self) -> Result<(), ShannonError> {
        let ids: HashSet<&str> = self.subtasks.iter().map(|s| s.id.as_str()).collect();
        for subtask in &self.subtasks {
            for dep in &subtask.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(ShannonError::Internal(anyhow::anyhow!(
                        "subtask {} depends on unknown sibling {}",
                        subtask.id,
                        dep
                    )));
                }
            }
        }
        topological_order(&self.subtasks).map(|_| ())
    }
}

/// Kahn's algorithm; levels are used by Hybrid/DAG to run each level with
/// Parallel. Returns `CyclicPlan` if a cycle is detected.
pub fn topological_order(subtasks: &[Subtask]) -> Result<Vec<Vec<String>>, ShannonError> {
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for s in subtasks {
        indegree.entry(s.id.as_str()).or_insert(0);
        for dep in &s.depends_on {
            *indegree.entry(s.id.as_str()).or_insert(0) += 1;
            dependents.entry(dep.as_str()).or_default().push(s.id.as_str());
        }
    }

    let mut levels = Vec::new();
    let mut frontier: Vec<&str> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| *id)
        .collect();
    frontier.sort_unstable();

    let mut remaining = indegree.len();
    while !frontier.is_empty() {
        remaining -= frontier.len();
        levels.push(frontier.iter().map(|s| s.to_string()).collect());
        let mut next = Vec::new();
        for id in &frontier {
            if let Some(deps) = dependents.get(id) {
                for dep in deps {
                    let entry = indegree.get_mut(dep).unwrap();
                    *entry -= 1;
                    if *entry == 0 {
                        next.push(*dep);
                    }
                }
            }
        }
        next.sort_unstable();
        frontier = next;
    }

    if remaining != 0 {
        return Err(ShannonError::CyclicPlan);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtask(id: &str, deps: &[&str]) -> Subtask {
        Subtask {
            id: id.to_string(),
            description: id.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            suggested_tools: Vec::new(),
            tool_parameters: None,
            produces: Vec::new(),
            consumes: Vec::new(),
        }
    }

    #[test]
    fn detects_cycle() {
        let plan = Plan {
            subtasks: vec![subtask("a", &["b"]), subtask("b", &["a"])],
            complexity: 0.5,
        };
        assert!(matches!(plan.validate(), Err(ShannonError::CyclicPlan)));
    }

    #[test]
    fn levels_respect_dependencies() {
        let subtasks = vec![subtask("a", &[]), subtask("b", &["a"]), subtask("c", &["a"])];
        let levels = topological_order(&subtasks).unwrap();
        assert_eq!(levels[0], vec!["a".to_string()]);
        let mut level1 = levels[1].clone();
        level1.sort();
        assert_eq!(level1, vec!["b".to_string(), "c".to_string()]);
    }
}
