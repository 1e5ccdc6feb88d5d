use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded activity/timer/signal/version-gate outcome. `idempotency_key`
/// is the replay lookup key; `seq` is the order it was recorded in, which
/// during a non-replayed run also matches the order it was requested in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub seq: u64,
    pub idempotency_key: String,
    pub kind: String,
    pub result: Value,
}

/// The append-only record a workflow execution produces. On replay (§4.I,
/// §5), this is fed back to the workflow so every wrapped call that finds
/// its key here skips the real side effect and returns the recorded result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub entries: Vec<HistoryEntry>,
}

impl History {
    pub fn find(&self, idempotency_key: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.idempotency_key == idempotency_key)
    }

    pub fn record(&mut self, kind: &str, idempotency_key: &str, result: Value) -> u64 {
        let seq = self.entries.len() as u64 + 1;
        self.entries.push(HistoryEntry { seq, idempotency_key: idempotency_key.to_string(), kind: kind.to_string(), result });
        seq
    }

    pub fn recorded_keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.idempotency_key.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_returns_none_for_unrecorded_key() {
        let history = History::default();
        assert!(history.find("missing").is_none());
    }

    #[test]
    fn record_assigns_increasing_seq() {
        let mut history = History::default();
        let a = history.record("activity", "a", serde_json::json!(1));
        let b = history.record("activity", "b", serde_json::json!(2));
        assert_eq!((a, b), (1, 2));
    }
}
