use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shannon_engine::WorkflowContext;
use shannon_streaming::StreamingManager;
use shannon_types::EventType;
use uuid::Uuid;

/// Tools that always require a human decision regardless of complexity,
/// mirroring a permission manager's deny-by-default posture for
/// destructive or externally-visible actions.
pub const DANGEROUS_TOOLS: &[&str] = &["shell_exec", "file_delete", "git_push", "send_email", "web_fetch_write"];

pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_COMPLEXITY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub feedback: Option<String>,
}

/// True when `tool_name` is on the dangerous list or `complexity` clears
/// `threshold` (§4.J).
pub fn requires_approval(tool_name: Option<&str>, complexity: f64, threshold: f64) -> bool {
    tool_name.is_some_and(|name| DANGEROUS_TOOLS.contains(&name)) || complexity >= threshold
}

/// Emits `APPROVAL_REQUESTED` and blocks on `human-approval-<approval_id>`
/// up to `timeout`. A timeout is treated as a denial so the calling branch
/// aborts rather than hangs; the caller surfaces `ShannonError::ApprovalTimeout`
/// if it needs to distinguish the two.
pub async fn request_approval(
    ctx: &WorkflowContext,
    streaming: &StreamingManager,
    action: &str,
    timeout: Duration,
) -> (String, Option<ApprovalDecision>) {
    let approval_id = Uuid::new_v4().to_string();
    streaming
        .publish(
            &ctx.workflow_id,
            EventType::ApprovalRequested,
            None,
            Some(action.to_string()),
            Some(json!({"approval_id": approval_id})),
        )
        .await;

    let signal_name = format!("human-approval-{approval_id}");
    let payload = ctx.wait_with_timeout(&signal_name, timeout).await;
    let decision = payload.and_then(|value| serde_json::from_value::<ApprovalDecision>(value).ok());
    (approval_id, decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangerous_tool_always_requires_approval() {
        assert!(requires_approval(Some("shell_exec"), 0.0, DEFAULT_COMPLEXITY_THRESHOLD));
    }

    #[test]
    fn high_complexity_requires_approval_without_a_dangerous_tool() {
        assert!(requires_approval(None, 0.9, DEFAULT_COMPLEXITY_THRESHOLD));
    }

    #[test]
    fn low_complexity_safe_tool_does_not_require_approval() {
        assert!(!requires_approval(Some("web_search"), 0.2, DEFAULT_COMPLEXITY_THRESHOLD));
    }
}
