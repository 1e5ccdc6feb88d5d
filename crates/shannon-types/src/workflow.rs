use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    Simple,
    Standard,
    Complex,
    Supervisor,
    Research,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// A single user query execution. Identity is immutable once created; the
/// recorded event history is append-only (see `shannon-streaming`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: String,
    pub task_id: uuid::Uuid,
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    pub mode: WorkflowMode,
    pub model_tier: ModelTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_agent_max: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_total_max: Option<u64>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Workflow {
    pub fn new(
        task_id: uuid::Uuid,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        query: impl Into<String>,
        mode: WorkflowMode,
        model_tier: ModelTier,
    ) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: format!("wf-{task_id}"),
            task_id,
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            session_id: None,
            query: query.into(),
            context: HashMap::new(),
            mode,
            model_tier,
            budget_agent_max: None,
            budget_total_max: None,
            status: WorkflowStatus::Queued,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// `budget_per_agent > 0` selects the budgeted activity path (§4.D);
    /// zero or unset means the pattern records usage itself.
    pub fn budgeted_per_agent(&self) -> bool {
        self.budget_agent_max.is_some_and(|v| v > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub result: Option<String>,
    pub usage: WorkflowUsage,
    pub model_used: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkflowUsage {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}
