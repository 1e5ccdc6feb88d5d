use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::money::Money;

/// A cost accounting row. Invariant: for a given `idempotency_key` there is
/// at most one row (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsageRecord {
    pub task_id: uuid::Uuid,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub agent_id: String,
    pub model: String,
    pub provider: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: Money,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl TokenUsageRecord {
    pub fn phase(&self) -> Option<&str> {
        self.metadata.get("phase").and_then(|v| v.as_str())
    }
}

/// Derives the idempotency key used by both the budgeted and non-budgeted
/// recording paths (§4.D): `(workflow_id, agent_id, attempt)`.
pub fn idempotency_key(workflow_id: &str, agent_id: &str, attempt: u32) -> String {
    format!("{workflow_id}:{agent_id}:{attempt}")
}
