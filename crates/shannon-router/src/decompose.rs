use async_trait::async_trait;
use serde_json::Value;
use shannon_types::{Plan, ShannonResult};

/// The decomposition service boundary the router calls at step 3 of §4.H:
/// turns a free-form query into a subtask plan plus a complexity score in
/// `[0, 1]`. Always invoked as an activity by the engine; workflow code
/// never calls an `AgentExecutor` for this directly (§5 replay discipline).
#[async_trait]
pub trait Decomposer: Send + Sync {
    async fn decompose(&self, query: &str, context: &Value) -> ShannonResult<Plan>;
}
