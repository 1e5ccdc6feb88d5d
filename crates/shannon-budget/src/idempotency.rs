use std::collections::HashMap;

use shannon_types::TokenUsageRecord;

/// Tracks exactly-once recording per §4.D: a duplicate `idempotency_key` is
/// always a no-op (returns the row already stored for that key), while two
/// *distinct* keys for the same `(workflow_id, agent_id)` pair — i.e. two
/// attempts of the same agent step — collapse to the latest attempt only,
/// superseding rather than summing the earlier attempt's row. This was an
/// open question in the distilled spec and is settled in `DESIGN.md`.
#[derive(Default)]
pub struct IdempotencyTable {
    by_key: HashMap<String, TokenUsageRecord>,
    latest_by_pair: HashMap<(String, String), String>,
}

pub enum RecordOutcome {
    Recorded(TokenUsageRecord),
    DuplicateKey(TokenUsageRecord),
}

impl IdempotencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `workflow_id`/`agent_id` identify the pair that latest-attempt-wins
    /// applies to; `record.idempotency_key` identifies the individual
    /// attempt.
    pub fn record(&mut self, workflow_id: &str, agent_id: &str, record: TokenUsageRecord) -> RecordOutcome {
        if let Some(existing) = self.by_key.get(&record.idempotency_key) {
            return RecordOutcome::DuplicateKey(existing.clone());
        }

        let pair = (workflow_id.to_string(), agent_id.to_string());
        if let Some(prev_key) = self.latest_by_pair.get(&pair) {
            self.by_key.remove(prev_key);
        }
        self.latest_by_pair.insert(pair, record.idempotency_key.clone());
        self.by_key.insert(record.idempotency_key.clone(), record.clone());
        RecordOutcome::Recorded(record)
    }

    pub fn latest_for(&self, workflow_id: &str, agent_id: &str) -> Option<&TokenUsageRecord> {
        let pair = (workflow_id.to_string(), agent_id.to_string());
        self.latest_by_pair.get(&pair).and_then(|key| self.by_key.get(key))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shannon_types::Money;
    use std::collections::HashMap as Map;

    fn row(idempotency_key: &str, total_tokens: u64) -> TokenUsageRecord {
        TokenUsageRecord {
            task_id: uuid::Uuid::new_v4(),
            user_id: "u-1".into(),
            session_id: None,
            agent_id: "agent-1".into(),
            model: "claude-3-haiku".into(),
            provider: "anthropic".into(),
            prompt_tokens: total_tokens / 2,
            completion_tokens: total_tokens - total_tokens / 2,
            total_tokens,
            cost_usd: Money::ZERO,
            created_at: Utc::now(),
            idempotency_key: idempotency_key.to_string(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn duplicate_key_is_a_no_op() {
        let mut table = IdempotencyTable::new();
        let first = row("wf-1:agent-1:1", 100);
        table.record("wf-1", "agent-1", first.clone());
        match table.record("wf-1", "agent-1", row("wf-1:agent-1:1", 999)) {
            RecordOutcome::DuplicateKey(existing) => assert_eq!(existing.total_tokens, 100),
            RecordOutcome::Recorded(_) => panic!("expected duplicate to be a no-op"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn later_attempt_supersedes_earlier_for_same_pair() {
        let mut table = IdempotencyTable::new();
        table.record("wf-1", "agent-1", row("wf-1:agent-1:1", 100));
        table.record("wf-1", "agent-1", row("wf-1:agent-1:2", 250));
        assert_eq!(table.len(), 1);
        assert_eq!(table.latest_for("wf-1", "agent-1").unwrap().total_tokens, 250);
    }
}
