pub mod agent;
pub mod budget;
pub mod error;
pub mod events;
pub mod money;
pub mod session;
pub mod subtask;
pub mod traits;
pub mod usage;
pub mod versioning;
pub mod workflow;

pub use agent::{AgentExecutionResult, ToolExecution};
pub use budget::{BudgetScope, BudgetState, ReservationToken};
pub use error::{ShannonError, ShannonResult};
pub use events::{EventType, StreamEvent};
pub use money::Money;
pub use session::{HistoryMessage, MemoryItem, MemorySource, MessageRole, Session};
pub use subtask::{topological_order, Plan, Subtask};
pub use traits::{
    AgentExecutionOutcome, AgentExecutor, MemoryQueryFilter, MemoryStore, SessionStore,
    ToolCallRequest, ToolExecutor, ToolInvocationOutcome,
};
pub use usage::{idempotency_key, TokenUsageRecord};
pub use versioning::FeatureVersion;
pub use workflow::{ModelTier, Workflow, WorkflowMode, WorkflowSnapshot, WorkflowStatus, WorkflowUsage};
