use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use shannon_types::{ShannonError, ShannonResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::history::History;
use crate::signals::SignalBus;
use shannon_types::FeatureVersion;

/// Everything workflow code needs to stay replay-safe (§4.I, §5): every
/// non-deterministic call — activity, timer, signal wait, version check —
/// goes through one of this type's methods instead of touching the clock,
/// a random source, or an external collaborator directly.
#[derive(Clone)]
pub struct WorkflowContext {
    pub workflow_id: String,
    pub task_id: Uuid,
    /// `true` when this context is driving a replay rather than a live
    /// execution (§8.3 replay harness); workflow code itself never needs to
    /// branch on this, but activities that short-circuit a real call when
    /// replaying (e.g. to skip a network fetch) may read it.
    pub replaying: bool,
    source: Arc<Mutex<History>>,
    observed: Arc<Mutex<Vec<String>>>,
    signals: Arc<SignalBus>,
    version_pins: Arc<Mutex<HashMap<FeatureVersion, bool>>>,
}

impl WorkflowContext {
    pub(crate) fn new(workflow_id: impl Into<String>, task_id: Uuid, replaying: bool, source: History, signals: Arc<SignalBus>) -> Self {
        WorkflowContext {
            workflow_id: workflow_id.into(),
            task_id,
            replaying,
            source: Arc::new(Mutex::new(source)),
            observed: Arc::new(Mutex::new(Vec::new())),
            signals,
            version_pins: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Snapshot of everything recorded against this context so far, for
    /// persistence or for feeding a later `replay` call.
    pub async fn history_snapshot(&self) -> History {
        self.source.lock().await.clone()
    }

    /// The sequence of idempotency keys this context has been asked to
    /// resolve, in request order — the signal the replay harness diffs
    /// between a recorded run and a replayed one (§8 property 3).
    pub async fn observed_keys(&self) -> Vec<String> {
        self.observed.lock().await.clone()
    }

    /// Executes `f` at most once per `idempotency_key` (§4.I "the core uses
    /// the engine to guarantee at-least-once activity execution with
    /// explicit idempotency keys"). On replay, a key already in `source`
    /// returns its recorded result without calling `f`; a key replay can't
    /// find is a divergence, not a fresh call.
    pub async fn execute_activity<T, F, Fut>(&self, idempotency_key: &str, f: F) -> ShannonResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ShannonResult<T>>,
    {
        self.observed.lock().await.push(idempotency_key.to_string());

        if let Some(entry) = self.source.lock().await.find(idempotency_key).cloned() {
            return serde_json::from_value(entry.result)
                .map_err(|e| ShannonError::Internal(anyhow::anyhow!("replay deserialize failed for {idempotency_key}: {e}")));
        }

        if self.replaying {
            return Err(ShannonError::Internal(anyhow::anyhow!(
                "replay diverged: activity {idempotency_key} not present in recorded history"
            )));
        }

        let result = f().await?;
        let serialized = serde_json::to_value(&result)
            .map_err(|e| ShannonError::Internal(anyhow::anyhow!("activity result not serializable for {idempotency_key}: {e}")))?;
        self.source.lock().await.record("activity", idempotency_key, serialized);
        Ok(result)
    }

    /// `sleep(d)` (§4.I): a no-op during replay once the timer's key is
    /// already recorded, a real wait otherwise.
    pub async fn sleep(&self, key: &str, duration: Duration) {
        self.observed.lock().await.push(format!("timer:{key}"));
        if self.source.lock().await.find(&format!("timer:{key}")).is_some() {
            return;
        }
        tokio::time::sleep(duration).await;
        self.source.lock().await.record("timer", &format!("timer:{key}"), json!({"duration_ms": duration.as_millis()}));
    }

    /// `wait_with_timeout(signal, d)` (§4.I). Returns the signal payload,
    /// or `None` on timeout.
    pub async fn wait_with_timeout(&self, signal_name: &str, timeout: Duration) -> Option<Value> {
        let key = format!("signal:{signal_name}");
        self.observed.lock().await.push(key.clone());

        if let Some(entry) = self.source.lock().await.find(&key).cloned() {
            return entry.result.get("payload").cloned();
        }

        let payload = self.signals.wait(signal_name, timeout).await;
        self.source.lock().await.record("signal", &key, json!({"payload": payload}));
        payload
    }

    pub fn signal_bus(&self) -> Arc<SignalBus> {
        self.signals.clone()
    }

    /// Versioning gate (§4.I, glossary "Version gate"): the decision is
    /// made once per feature per execution and pinned into history so a
    /// later replay always sees the same answer regardless of what the
    /// engine's current default would be. New workflow executions default
    /// to the new behavior (`true`); only a replayed execution of history
    /// recorded before a feature existed can observe `false`.
    pub async fn version_active(&self, feature: FeatureVersion) -> bool {
        let key = format!("version:{}", feature.as_str());
        self.observed.lock().await.push(key.clone());

        if let Some(entry) = self.source.lock().await.find(&key).cloned() {
            return entry.result.get("active").and_then(Value::as_bool).unwrap_or(false);
        }

        let active = {
            let mut pins = self.version_pins.lock().await;
            *pins.entry(feature).or_insert(true)
        };
        self.source.lock().await.record("version_gate", &key, json!({"active": active}));
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(replaying: bool, source: History) -> WorkflowContext {
        WorkflowContext::new("wf-1", Uuid::new_v4(), replaying, source, Arc::new(SignalBus::new()))
    }

    #[tokio::test]
    async fn fresh_activity_call_runs_and_records() {
        let context = ctx(false, History::default());
        let result: u32 = context.execute_activity("step-1", || async { Ok(42u32) }).await.unwrap();
        assert_eq!(result, 42);
        assert_eq!(context.history_snapshot().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn replay_returns_recorded_result_without_calling_f() {
        let mut source = History::default();
        source.record("activity", "step-1", serde_json::json!(99));
        let context = ctx(true, source);
        let result: u32 = context
            .execute_activity("step-1", || async { panic!("must not be called during replay") })
            .await
            .unwrap();
        assert_eq!(result, 99);
    }

    #[tokio::test]
    async fn replay_diverges_on_unknown_key() {
        let context = ctx(true, History::default());
        let result: ShannonResult<u32> = context.execute_activity("missing", || async { Ok(1u32) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn version_gate_is_pinned_across_calls() {
        let context = ctx(false, History::default());
        let first = context.version_active(FeatureVersion::GapFillingV1).await;
        let second = context.version_active(FeatureVersion::GapFillingV1).await;
        assert_eq!(first, second);
    }
}
