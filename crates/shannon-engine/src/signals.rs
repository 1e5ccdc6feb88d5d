use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

/// Named asynchronous message delivery into a running workflow (§4.I):
/// `human-approval-<id>`, `recruit_v1`, `retire_v1`. One engine owns one
/// `SignalBus`; every `WorkflowContext` it hands out shares it, so a signal
/// sent from outside the workflow (an HTTP decision endpoint, for example)
/// reaches whichever `wait` call is pending on that name.
#[derive(Default)]
pub struct SignalBus {
    waiters: Mutex<HashMap<String, Vec<oneshot::Sender<Value>>>>,
}

impl SignalBus {
    pub fn new() -> Self {
        SignalBus::default()
    }

    /// Delivers `payload` to every current waiter on `name`. A signal sent
    /// with no waiters registered is dropped, matching an at-most-once,
    /// non-durable signal delivery model — callers that need a signal to
    /// survive a restart persist it via the workflow's own history instead.
    pub async fn send(&self, name: &str, payload: Value) {
        let mut waiters = self.waiters.lock().await;
        if let Some(senders) = waiters.remove(name) {
            for sender in senders {
                let _ = sender.send(payload.clone());
            }
        }
    }

    /// Waits up to `timeout` for a signal on `name`. Returns `None` on
    /// timeout; the caller (§4.J approvals) is responsible for turning that
    /// into `ApprovalTimeout`.
    pub async fn wait(&self, name: &str, timeout: Duration) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.entry(name.to_string()).or_default().push(tx);
        tokio::time::timeout(timeout, rx).await.ok().and_then(|r| r.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_signal_to_waiter() {
        let bus = SignalBus::new();
        let wait = bus.wait("human-approval-abc", Duration::from_secs(1));
        let send = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            bus.send("human-approval-abc", serde_json::json!({"approved": true})).await;
        };
        let (result, _) = tokio::join!(wait, send);
        assert_eq!(result, Some(serde_json::json!({"approved": true})));
    }

    #[tokio::test]
    async fn times_out_with_no_signal() {
        let bus = SignalBus::new();
        let result = bus.wait("human-approval-none", Duration::from_millis(20)).await;
        assert!(result.is_none());
    }
}
