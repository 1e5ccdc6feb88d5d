use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shannon_types::StreamEvent;
use tokio::sync::RwLock;

/// Short-TTL durable backing for critical events (§4.B, §6.4): 24h event
/// TTL, bounded length ~256/workflow, 48h seq-counter TTL. Only critical
/// event types are written here (ephemeral types live in the ring only).
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn append(&self, event: StreamEvent);
    async fn read_since(&self, workflow_id: &str, from_seq: u64) -> Vec<StreamEvent>;
    /// Oldest `seq` still retained, if the workflow has any durable history.
    async fn oldest_seq(&self, workflow_id: &str) -> Option<u64>;
}

struct WorkflowLog {
    events: Vec<StreamEvent>,
    stored_at: Vec<DateTime<Utc>>,
}

/// Reference in-process implementation standing in for the real durable
/// event-stream service (§6.4). Evicts entries older than `ttl` and bounds
/// each workflow's log to `max_len`.
pub struct InMemoryDurableStore {
    logs: RwLock<HashMap<String, WorkflowLog>>,
    ttl: Duration,
    max_len: usize,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        InMemoryDurableStore {
            logs: RwLock::new(HashMap::new()),
            ttl: Duration::hours(24),
            max_len: 256,
        }
    }

    pub fn with_ttl(ttl: Duration, max_len: usize) -> Self {
        InMemoryDurableStore {
            logs: RwLock::new(HashMap::new()),
            ttl,
            max_len,
        }
    }

    fn evict(log: &mut WorkflowLog, now: DateTime<Utc>, ttl: Duration, max_len: usize) {
        while let Some(stored_at) = log.stored_at.first() {
            if now.signed_duration_since(*stored_at) > ttl {
                log.events.remove(0);
                log.stored_at.remove(0);
            } else {
                break;
            }
        }
        while log.events.len() > max_len {
            log.events.remove(0);
            log.stored_at.remove(0);
        }
    }
}

impl Default for InMemoryDurableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn append(&self, event: StreamEvent) {
        if !event.is_critical() {
            return;
        }
        let now = Utc::now();
        let mut logs = self.logs.write().await;
        let log = logs.entry(event.workflow_id.clone()).or_insert_with(|| WorkflowLog {
            events: Vec::new(),
            stored_at: Vec::new(),
        });
        log.events.push(event);
        log.stored_at.push(now);
        Self::evict(log, now, self.ttl, self.max_len);
    }

    async fn read_since(&self, workflow_id: &str, from_seq: u64) -> Vec<StreamEvent> {
        let logs = self.logs.read().await;
        logs.get(workflow_id)
            .map(|log| log.events.iter().filter(|e| e.seq > from_seq).cloned().collect())
            .unwrap_or_default()
    }

    async fn oldest_seq(&self, workflow_id: &str) -> Option<u64> {
        let logs = self.logs.read().await;
        logs.get(workflow_id).and_then(|log| log.events.first()).map(|e| e.seq)
    }
}

pub type SharedDurableStore = Arc<dyn DurableStore>;
