use serde::{Deserialize, Serialize};
use serde_json::json;
use shannon_engine::WorkflowContext;
use shannon_streaming::StreamingManager;
use shannon_types::{EventType, FeatureVersion, Subtask};

/// A teammate an active supervisor run has recruited, beyond the subtasks
/// the original decomposition produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    pub agent_id: String,
    pub role: Option<String>,
    pub subtask_id: String,
}

/// The supervisor's live roster. `recruit`/`retire` mutate it in place and
/// are the only way the active set changes once a workflow starts (§4.J
/// "Dynamic team (supervisor only, feature-gated)").
#[derive(Debug, Clone, Default)]
pub struct DynamicTeam {
    pub members: Vec<TeamMember>,
}

impl DynamicTeam {
    pub fn new() -> Self {
        DynamicTeam::default()
    }

    /// `recruit_v1{description, role?}`: adds a new subtask with the given
    /// role and emits `TEAM_RECRUITED`. A no-op producing no member when the
    /// `recruit_v1` gate isn't active for this execution (e.g. replaying a
    /// history recorded before the feature existed).
    pub async fn recruit(
        &mut self,
        ctx: &WorkflowContext,
        streaming: &StreamingManager,
        description: &str,
        role: Option<String>,
    ) -> Option<TeamMember> {
        if !ctx.version_active(FeatureVersion::RecruitV1).await {
            return None;
        }

        let subtask = Subtask {
            id: format!("recruited-{}", self.members.len() + 1),
            description: description.to_string(),
            depends_on: Vec::new(),
            suggested_tools: Vec::new(),
            tool_parameters: Default::default(),
            produces: Vec::new(),
            consumes: Vec::new(),
        };
        let member = TeamMember { agent_id: subtask.id.clone(), role: role.clone(), subtask_id: subtask.id.clone() };
        self.members.push(member.clone());

        streaming
            .publish(
                &ctx.workflow_id,
                EventType::TeamRecruited,
                Some(member.agent_id.clone()),
                Some(description.to_string()),
                Some(json!({"role": role, "subtask_id": subtask.id})),
            )
            .await;

        Some(member)
    }

    /// `retire_v1{agent_id}`: drops `agent_id` from the active set and
    /// emits `TEAM_RETIRED`. Returns `false` if the agent wasn't active or
    /// the `retire_v1` gate isn't active for this execution.
    pub async fn retire(&mut self, ctx: &WorkflowContext, streaming: &StreamingManager, agent_id: &str) -> bool {
        if !ctx.version_active(FeatureVersion::RetireV1).await {
            return false;
        }

        let before = self.members.len();
        self.members.retain(|m| m.agent_id != agent_id);
        let removed = self.members.len() < before;

        if removed {
            streaming
                .publish(&ctx.workflow_id, EventType::TeamRetired, Some(agent_id.to_string()), None, None)
                .await;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_engine::Engine;
    use shannon_streaming::{EventStore, InMemoryDurableStore};
    use std::sync::Arc;

    fn streaming() -> StreamingManager {
        let store = Arc::new(EventStore::new(Arc::new(InMemoryDurableStore::default())));
        StreamingManager::new(store, Arc::new(|_: &str| true))
    }

    #[tokio::test]
    async fn recruit_adds_member_and_emits_event() {
        let engine = Engine::new();
        let ctx = engine.new_context("wf-1", uuid::Uuid::new_v4());
        let streaming = streaming();
        let mut team = DynamicTeam::new();

        let member = team.recruit(&ctx, &streaming, "extra research help", Some("researcher".to_string())).await;
        assert!(member.is_some());
        assert_eq!(team.members.len(), 1);
    }

    #[tokio::test]
    async fn retire_removes_recruited_member() {
        let engine = Engine::new();
        let ctx = engine.new_context("wf-1", uuid::Uuid::new_v4());
        let streaming = streaming();
        let mut team = DynamicTeam::new();
        let member = team.recruit(&ctx, &streaming, "extra help", None).await.unwrap();

        let removed = team.retire(&ctx, &streaming, &member.agent_id).await;
        assert!(removed);
        assert!(team.members.is_empty());
    }

    #[tokio::test]
    async fn retire_unknown_agent_is_a_no_op() {
        let engine = Engine::new();
        let ctx = engine.new_context("wf-1", uuid::Uuid::new_v4());
        let streaming = streaming();
        let mut team = DynamicTeam::new();

        let removed = team.retire(&ctx, &streaming, "nonexistent").await;
        assert!(!removed);
    }
}
