use serde::{Deserialize, Serialize};
use shannon_types::{WorkflowStatus, WorkflowUsage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResultMetadata {
    pub model_used: Option<String>,
    pub provider: Option<String>,
}

/// The `Get` response body (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub result: String,
    pub usage: WorkflowUsage,
    pub metadata: GetResultMetadata,
}
