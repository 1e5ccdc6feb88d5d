use async_trait::async_trait;
use serde_json::Value;

use crate::error::ShannonResult;
use crate::session::{MemoryItem, Session};
use crate::workflow::ModelTier;

#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone)]
pub struct AgentExecutionOutcome {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model_used: String,
    pub provider: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

/// The LLM provider service boundary (§6.3). Consumed by patterns/activities
/// via the engine; never called directly from workflow code (§5 replay
/// discipline — it is always wrapped in an activity).
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(
        &self,
        prompt: &str,
        tools: Option<&[String]>,
        model_tier: ModelTier,
        max_tokens: Option<u32>,
    ) -> ShannonResult<AgentExecutionOutcome>;
}

#[derive(Debug, Clone)]
pub struct ToolInvocationOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// The sandboxed code-execution boundary (§6.3).
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn invoke(
        &self,
        name: &str,
        params: Value,
        session_workspace: Option<&str>,
    ) -> ShannonResult<ToolInvocationOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryQueryFilter {
    pub tenant_id: Option<String>,
    pub project_id: Option<String>,
}

/// The vector/session memory store boundary (§6.3). Shannon's core never
/// embeds text itself (Non-goals) — embedding happens behind whatever
/// implements this trait.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn query(
        &self,
        session_id: &str,
        query: &str,
        k: usize,
        filter: &MemoryQueryFilter,
    ) -> ShannonResult<Vec<MemoryItem>>;

    async fn upsert(&self, session_id: &str, items: Vec<MemoryItem>) -> ShannonResult<()>;
}

/// The relational session-store boundary (§6.3). Enforces per-session
/// single-writer at the call site, not inside the trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> ShannonResult<Option<Session>>;
    async fn save(&self, session: &Session) -> ShannonResult<()>;
}
