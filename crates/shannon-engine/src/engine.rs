use std::sync::Arc;

use uuid::Uuid;

use crate::context::WorkflowContext;
use crate::history::History;
use crate::signals::SignalBus;

/// Owns the one `SignalBus` shared by every workflow execution it spawns
/// contexts for. A process runs a single `Engine`; the HTTP layer (§6.1)
/// holds it behind an `Arc` alongside the session/budget stores.
pub struct Engine {
    signals: Arc<SignalBus>,
}

impl Engine {
    pub fn new() -> Self {
        Engine { signals: Arc::new(SignalBus::new()) }
    }

    /// A context for a brand-new workflow execution: empty history, not
    /// replaying.
    pub fn new_context(&self, workflow_id: impl Into<String>, task_id: Uuid) -> WorkflowContext {
        WorkflowContext::new(workflow_id, task_id, false, History::default(), self.signals.clone())
    }

    /// A context for replaying a previously recorded history (§4.I, §8.3).
    pub fn replay_context(&self, workflow_id: impl Into<String>, task_id: Uuid, history: History) -> WorkflowContext {
        WorkflowContext::new(workflow_id, task_id, true, history, self.signals.clone())
    }

    pub fn signal_bus(&self) -> Arc<SignalBus> {
        self.signals.clone()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_context_starts_with_empty_history() {
        let engine = Engine::new();
        let ctx = engine.new_context("wf-1", Uuid::new_v4());
        assert!(ctx.history_snapshot().await.entries.is_empty());
        assert!(!ctx.replaying);
    }

    #[tokio::test]
    async fn replay_context_carries_recorded_history() {
        let engine = Engine::new();
        let mut history = History::default();
        history.record("activity", "step-1", serde_json::json!(1));
        let ctx = engine.replay_context("wf-1", Uuid::new_v4(), history);
        assert!(ctx.replaying);
        assert_eq!(ctx.history_snapshot().await.entries.len(), 1);
    }
}
