use serde::{Deserialize, Serialize};

/// The accounting domain over which token usage is limited (§3 BudgetState,
/// glossary "Budget scope").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetScope {
    Task { task_id: uuid::Uuid },
    Session { session_id: String },
    Agent { task_id: uuid::Uuid, agent_id: String },
}

impl BudgetScope {
    pub fn key(&self) -> String {
        match self {
            BudgetScope::Task { task_id } => format!("task:{task_id}"),
            BudgetScope::Session { session_id } => format!("session:{session_id}"),
            BudgetScope::Agent { task_id, agent_id } => format!("agent:{task_id}:{agent_id}"),
        }
    }
}

/// Running accumulators for one scope. Invariant: `used + reserved <= limit`
/// when enforcement is on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetState {
    pub limit: u64,
    pub used: u64,
    pub reserved: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_until_epoch_ms: Option<i64>,
}

impl BudgetState {
    pub fn new(limit: u64) -> Self {
        BudgetState {
            limit,
            used: 0,
            reserved: 0,
            backoff_until_epoch_ms: None,
        }
    }

    pub fn unlimited() -> Self {
        BudgetState::new(u64::MAX)
    }

    pub fn available(&self) -> u64 {
        self.limit
            .saturating_sub(self.used)
            .saturating_sub(self.reserved)
    }

    pub fn can_reserve(&self, estimate: u64) -> bool {
        self.used.saturating_add(self.reserved).saturating_add(estimate) <= self.limit
    }

    pub fn conserved(&self) -> bool {
        self.used.saturating_add(self.reserved) <= self.limit
    }
}

/// A live reservation token returned by `check_and_reserve`. Must be
/// converted to `used` via `record` or dropped via `release` — never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationToken {
    pub scope: BudgetScope,
    pub amount: u64,
    pub token_id: uuid::Uuid,
}
