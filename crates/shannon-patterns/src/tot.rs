use shannon_types::ShannonResult;

use crate::common::{PatternContext, PatternOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    Scoring,
    Voting,
    Llm,
}

/// §4.F.7 Tree-of-Thoughts.
#[derive(Debug, Clone)]
pub struct TreeOfThoughtsConfig {
    pub branching_factor: u32,
    pub max_depth: u32,
    pub scoring: ScoringMode,
    pub pruning_threshold: f64,
    pub backtracking: bool,
    pub exploration_budget: u32,
}

impl Default for TreeOfThoughtsConfig {
    fn default() -> Self {
        TreeOfThoughtsConfig {
            branching_factor: 3,
            max_depth: 3,
            scoring: ScoringMode::Scoring,
            pruning_threshold: 0.3,
            backtracking: false,
            exploration_budget: 20,
        }
    }
}

struct Branch {
    path: String,
    score: f64,
    depth: u32,
}

/// Expands thoughts breadth-first, evaluating and pruning each level, up to
/// `max_depth` or `exploration_budget` agent calls (whichever comes first).
/// `backtracking` allows re-expanding a previously pruned branch's parent
/// when every surviving branch at a level scores below the pruning
/// threshold, rather than terminating with no viable path.
pub async fn run(ctx: &PatternContext, query: &str, config: &TreeOfThoughtsConfig, attempt: u32) -> ShannonResult<PatternOutput> {
    let branching_factor = config.branching_factor.clamp(2, 4);
    let mut steps = Vec::new();
    let mut frontier = vec![Branch { path: query.to_string(), score: 1.0, depth: 0 }];
    let mut calls_made = 0u32;
    let mut best: Option<Branch> = None;

    for _depth in 0..config.max_depth {
        if calls_made >= config.exploration_budget {
            break;
        }
        let mut next_frontier = Vec::new();

        for parent in &frontier {
            for branch_idx in 0..branching_factor {
                if calls_made >= config.exploration_budget {
                    break;
                }
                let agent_id = format!("thought-{}-{}", parent.depth, branch_idx);
                let prompt = format!("{}\n\nPropose the next reasoning step (branch {branch_idx}).", parent.path);
                let result = ctx.run_agent_step(&agent_id, &prompt, None, attempt).await?;
                calls_made += 1;

                let score = score_branch(&config.scoring, &result.response);
                let path = format!("{}\n-> {}", parent.path, result.response);
                steps.push(result);

                if score >= config.pruning_threshold {
                    next_frontier.push(Branch { path, score, depth: parent.depth + 1 });
                }
            }
        }

        if next_frontier.is_empty() {
            if config.backtracking {
                next_frontier = frontier;
            } else {
                break;
            }
        }

        next_frontier.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(top) = next_frontier.first() {
            let should_replace = match &best {
                Some(b) => top.score > b.score,
                None => true,
            };
            if should_replace {
                best = Some(Branch { path: top.path.clone(), score: top.score, depth: top.depth });
            }
        }
        frontier = next_frontier;
    }

    let response = best.map(|b| b.path).unwrap_or_else(|| query.to_string());
    Ok(PatternOutput { response, steps, confidence: None })
}

fn score_branch(mode: &ScoringMode, text: &str) -> f64 {
    match mode {
        ScoringMode::Scoring | ScoringMode::Llm | ScoringMode::Voting => {
            // Deterministic stand-in: length-normalized non-emptiness. Real
            // scoring/voting/LLM evaluators plug in here via the same
            // signature once a judge collaborator trait is wired up.
            if text.trim().is_empty() { 0.0 } else { 0.6 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_context;

    #[tokio::test]
    async fn clamps_branching_factor_to_spec_range() {
        let ctx = stub_context();
        let config = TreeOfThoughtsConfig { branching_factor: 10, max_depth: 1, exploration_budget: 100, ..TreeOfThoughtsConfig::default() };
        let out = run(&ctx, "q", &config, 1).await.unwrap();
        assert!(out.steps.len() <= 4);
    }

    #[tokio::test]
    async fn respects_exploration_budget() {
        let ctx = stub_context();
        let config = TreeOfThoughtsConfig { exploration_budget: 2, max_depth: 5, ..TreeOfThoughtsConfig::default() };
        let out = run(&ctx, "q", &config, 1).await.unwrap();
        assert!(out.steps.len() <= 2);
    }
}
