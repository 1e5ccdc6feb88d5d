use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use shannon_types::{EventType, ShannonError, ShannonResult, StreamEvent};
use tokio::sync::RwLock;

use crate::durable::SharedDurableStore;
use crate::ring::{EventRing, DEFAULT_RING_CAPACITY};

/// Gives every workflow a bounded, ordered event log with deterministic
/// `seq` numbers and an optional durable backing (§4.B).
pub struct EventStore {
    rings: RwLock<HashMap<String, Arc<RwLock<EventRing>>>>,
    durable: SharedDurableStore,
    ring_capacity: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReadFilter {
    pub types: Vec<EventType>,
}

impl ReadFilter {
    fn matches(&self, event: &StreamEvent) -> bool {
        self.types.is_empty() || self.types.contains(&event.event_type)
    }
}

impl EventStore {
    pub fn new(durable: SharedDurableStore) -> Self {
        EventStore {
            rings: RwLock::new(HashMap::new()),
            durable,
            ring_capacity: DEFAULT_RING_CAPACITY,
        }
    }

    pub fn with_capacity(durable: SharedDurableStore, capacity: usize) -> Self {
        EventStore {
            rings: RwLock::new(HashMap::new()),
            durable,
            ring_capacity: capacity,
        }
    }

    async fn ring_for(&self, workflow_id: &str) -> Arc<RwLock<EventRing>> {
        if let Some(ring) = self.rings.read().await.get(workflow_id) {
            return ring.clone();
        }
        let mut rings = self.rings.write().await;
        rings
            .entry(workflow_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(EventRing::new(self.ring_capacity))))
            .clone()
    }

    /// Assigns the next `seq` atomically per workflow and writes into the
    /// ring; critical events additionally flow to the durable store (§4.B).
    pub async fn append(
        &self,
        workflow_id: &str,
        event_type: EventType,
        agent_id: Option<String>,
        message: Option<String>,
        payload: Option<serde_json::Value>,
    ) -> StreamEvent {
        let ring = self.ring_for(workflow_id).await;
        let seq = {
            let guard = ring.read().await;
            guard.reserve_seq()
        };
        let event = StreamEvent {
            workflow_id: workflow_id.to_string(),
            event_type,
            agent_id,
            message,
            payload,
            timestamp: Utc::now(),
            seq,
            stream_id: None,
        };
        {
            let mut guard = ring.write().await;
            guard.push(event.clone());
        }
        if event.is_critical() {
            self.durable.append(event.clone()).await;
        } else {
            tracing::trace!(workflow_id, seq, "ephemeral event recorded in ring only");
        }
        event
    }

    /// Replays from the requested offset: serves from the ring when
    /// possible, else falls back to the durable store for critical events.
    /// Returns `WorkflowNotFound` if the offset predates both (§8 invariant 6).
    pub async fn read(
        &self,
        workflow_id: &str,
        from_seq: u64,
        filter: &ReadFilter,
    ) -> ShannonResult<Vec<StreamEvent>> {
        let ring = self.ring_for(workflow_id).await;
        let ring_guard = ring.read().await;

        if ring_guard.is_empty() || ring_guard.oldest_seq().map(|s| s <= from_seq + 1).unwrap_or(false) {
            let events = ring_guard
                .since(from_seq)
                .into_iter()
                .filter(|e| filter.matches(e))
                .collect();
            return Ok(events);
        }

        let durable_events = self.durable.read_since(workflow_id, from_seq).await;
        if durable_events.is_empty() && self.durable.oldest_seq(workflow_id).await.is_none() {
            return Err(ShannonError::WorkflowNotFound {
                workflow_id: workflow_id.to_string(),
            });
        }
        let mut combined = durable_events;
        combined.extend(ring_guard.since(combined.last().map(|e| e.seq).unwrap_or(from_seq)));
        combined.sort_by_key(|e| e.seq);
        combined.dedup_by_key(|e| e.seq);
        Ok(combined.into_iter().filter(|e| filter.matches(e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::InMemoryDurableStore;

    #[tokio::test]
    async fn append_assigns_contiguous_seq() {
        let store = EventStore::new(Arc::new(InMemoryDurableStore::new()));
        let mut seqs = Vec::new();
        for _ in 0..5 {
            let e = store.append("wf-1", EventType::Progress, None, None, None).await;
            seqs.push(e.seq);
        }
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn read_since_excludes_already_seen() {
        let store = EventStore::new(Arc::new(InMemoryDurableStore::new()));
        for _ in 0..10 {
            store.append("wf-1", EventType::Progress, None, None, None).await;
        }
        let events = store.read("wf-1", 7, &ReadFilter::default()).await.unwrap();
        assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![8, 9, 10]);
    }

    #[tokio::test]
    async fn read_filters_by_type() {
        let store = EventStore::new(Arc::new(InMemoryDurableStore::new()));
        store.append("wf-1", EventType::AgentStarted, None, None, None).await;
        store.append("wf-1", EventType::AgentCompleted, None, None, None).await;
        let filter = ReadFilter {
            types: vec![EventType::AgentCompleted],
        };
        let events = store.read("wf-1", 0, &filter).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::AgentCompleted);
    }
}
