use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_name: String,
    pub params: Value,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Outcome of one agent step. Invariant: if `total_tokens > 0` then
/// `model_used` and `provider` are non-empty (checked in `validate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub agent_id: String,
    pub response: String,
    pub model_used: String,
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(default)]
    pub tool_executions: Vec<ToolExecution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl AgentExecutionResult {
    pub fn validate(&self) -> Result<(), String> {
        if self.total_tokens > 0 && (self.model_used.is_empty() || self.provider.is_empty()) {
            return Err(format!(
                "agent {} reported {} tokens without model_used/provider",
                self.agent_id, self.total_tokens
            ));
        }
        Ok(())
    }

    pub fn is_zero_token(&self) -> bool {
        self.total_tokens == 0
    }
}
