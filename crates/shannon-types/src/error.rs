use thiserror::Error;

use crate::budget::BudgetScope;

/// The enumerated error kinds from the core's error-handling design.
///
/// These are typed result values, not opaque throwables: workflow-visible
/// failures are always one of these variants so a caller can branch on
/// `kind()` instead of matching on message text.
#[derive(Debug, Error)]
pub enum ShannonError {
    #[error("budget exceeded for scope {scope:?} (limit {limit}, requested {requested})")]
    BudgetExceeded {
        scope: BudgetScope,
        limit: u64,
        requested: u64,
    },

    #[error("model {model} unavailable on provider {provider}")]
    ModelUnavailable { model: String, provider: String },

    #[error("subtask plan contains a cycle")]
    CyclicPlan,

    #[error("workflow cancelled")]
    Cancelled,

    #[error("deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    #[error("session {session_id} is busy with another workflow")]
    SessionBusy { session_id: String },

    #[error("upstream {upstream} unavailable: {reason}")]
    UpstreamUnavailable { upstream: String, reason: String },

    #[error("workflow {workflow_id} not found")]
    WorkflowNotFound { workflow_id: String },

    #[error("approval {approval_id} denied: {feedback}")]
    ApprovalDenied {
        approval_id: String,
        feedback: String,
    },

    #[error("approval {approval_id} timed out after {timeout_secs}s")]
    ApprovalTimeout {
        approval_id: String,
        timeout_secs: u64,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ShannonError {
    /// A short, stable tag for metrics/logging that never embeds
    /// interpolated values (unlike `Display`).
    pub fn kind(&self) -> &'static str {
        match self {
            ShannonError::BudgetExceeded { .. } => "budget_exceeded",
            ShannonError::ModelUnavailable { .. } => "model_unavailable",
            ShannonError::CyclicPlan => "cyclic_plan",
            ShannonError::Cancelled => "cancelled",
            ShannonError::DeadlineExceeded { .. } => "deadline_exceeded",
            ShannonError::SessionBusy { .. } => "session_busy",
            ShannonError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ShannonError::WorkflowNotFound { .. } => "workflow_not_found",
            ShannonError::ApprovalDenied { .. } => "approval_denied",
            ShannonError::ApprovalTimeout { .. } => "approval_timeout",
            ShannonError::Internal(_) => "internal",
        }
    }

    /// Whether the activity layer should retry this with backoff. Pattern
    /// code never retries side-effecting operations itself (§7).
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ShannonError::SessionBusy { .. } | ShannonError::UpstreamUnavailable { .. }
        )
    }
}

pub type ShannonResult<T> = std::result::Result<T, ShannonError>;
