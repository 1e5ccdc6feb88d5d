use shannon_types::ShannonResult;

use crate::common::{PatternContext, PatternOutput};

/// §4.F.6 Debate.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    pub roles: Vec<String>,
    pub rounds: u32,
    pub require_consensus: bool,
}

impl Default for DebateConfig {
    fn default() -> Self {
        DebateConfig {
            roles: vec!["proponent".to_string(), "critic".to_string(), "moderator".to_string()],
            rounds: 3,
            require_consensus: false,
        }
    }
}

/// Runs `rounds` rounds across `roles`, one agent call per role per round,
/// each seeing the full transcript so far. When `require_consensus` is set
/// and the final round's moderator-equivalent (last role) output contains
/// "consensus", the debate is marked resolved in the response prefix.
pub async fn run(ctx: &PatternContext, topic: &str, config: &DebateConfig, attempt: u32) -> ShannonResult<PatternOutput> {
    let mut steps = Vec::new();
    let mut transcript = format!("Debate topic: {topic}");

    for round in 0..config.rounds {
        for role in &config.roles {
            let agent_id = format!("{role}-round{round}");
            let prompt = format!("{transcript}\n\nAs the {role}, respond for round {round}.");
            let result = ctx.run_agent_step(&agent_id, &prompt, None, attempt).await?;
            transcript.push_str(&format!("\n[{role} round {round}]: {}", result.response));
            steps.push(result);
        }
    }

    let last_response = steps.last().map(|s| s.response.clone()).unwrap_or_default();
    let consensus_reached = last_response.to_lowercase().contains("consensus");
    let response = if config.require_consensus {
        format!("consensus={consensus_reached}\n{last_response}")
    } else {
        last_response
    };

    Ok(PatternOutput { response, steps, confidence: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stub_context;

    #[tokio::test]
    async fn runs_one_call_per_role_per_round() {
        let ctx = stub_context();
        let config = DebateConfig { roles: vec!["a".into(), "b".into()], rounds: 2, require_consensus: false };
        let out = run(&ctx, "topic", &config, 1).await.unwrap();
        assert_eq!(out.steps.len(), 4);
    }
}
