use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The stable event-type enum (§6.2). Serializes as SCREAMING_SNAKE_CASE to
/// match the wire names callers key off of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    AgentStarted,
    AgentCompleted,
    AgentFailed,
    AgentThinking,
    LlmPrompt,
    LlmPartial,
    LlmOutput,
    ToolInvoked,
    ToolObservation,
    ToolError,
    ErrorOccurred,
    ErrorRecovery,
    Progress,
    DataProcessing,
    TeamStatus,
    Waiting,
    WorkspaceUpdated,
    Delegation,
    MessageSent,
    MessageReceived,
    TeamRecruited,
    TeamRetired,
    RoleAssigned,
    ApprovalRequested,
    ApprovalDecision,
    DependencySatisfied,
    BudgetThreshold,
}

impl EventType {
    /// Critical events are persisted beyond the short-TTL streaming window
    /// (§4.B, §6.2). Everything else is ephemeral: ring + short-TTL durable
    /// stream only.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            EventType::WorkflowCompleted
                | EventType::WorkflowFailed
                | EventType::AgentCompleted
                | EventType::AgentFailed
                | EventType::ToolInvoked
                | EventType::ToolObservation
                | EventType::ToolError
                | EventType::LlmOutput
                | EventType::ErrorOccurred
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::WorkflowStarted => "WORKFLOW_STARTED",
            EventType::WorkflowCompleted => "WORKFLOW_COMPLETED",
            EventType::WorkflowFailed => "WORKFLOW_FAILED",
            EventType::AgentStarted => "AGENT_STARTED",
            EventType::AgentCompleted => "AGENT_COMPLETED",
            EventType::AgentFailed => "AGENT_FAILED",
            EventType::AgentThinking => "AGENT_THINKING",
            EventType::LlmPrompt => "LLM_PROMPT",
            EventType::LlmPartial => "LLM_PARTIAL",
            EventType::LlmOutput => "LLM_OUTPUT",
            EventType::ToolInvoked => "TOOL_INVOKED",
            EventType::ToolObservation => "TOOL_OBSERVATION",
            EventType::ToolError => "TOOL_ERROR",
            EventType::ErrorOccurred => "ERROR_OCCURRED",
            EventType::ErrorRecovery => "ERROR_RECOVERY",
            EventType::Progress => "PROGRESS",
            EventType::DataProcessing => "DATA_PROCESSING",
            EventType::TeamStatus => "TEAM_STATUS",
            EventType::Waiting => "WAITING",
            EventType::WorkspaceUpdated => "WORKSPACE_UPDATED",
            EventType::Delegation => "DELEGATION",
            EventType::MessageSent => "MESSAGE_SENT",
            EventType::MessageReceived => "MESSAGE_RECEIVED",
            EventType::TeamRecruited => "TEAM_RECRUITED",
            EventType::TeamRetired => "TEAM_RETIRED",
            EventType::RoleAssigned => "ROLE_ASSIGNED",
            EventType::ApprovalRequested => "APPROVAL_REQUESTED",
            EventType::ApprovalDecision => "APPROVAL_DECISION",
            EventType::DependencySatisfied => "DEPENDENCY_SATISFIED",
            EventType::BudgetThreshold => "BUDGET_THRESHOLD",
        }
    }
}

/// A deterministic observable event. Within a workflow `seq` is strictly
/// increasing and events are append-only (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub workflow_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

impl StreamEvent {
    pub fn is_critical(&self) -> bool {
        self.event_type.is_critical()
    }
}
