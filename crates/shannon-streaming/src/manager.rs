use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shannon_types::{EventType, ShannonError, StreamEvent};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::store::{EventStore, ReadFilter};

/// An out-of-band frame a subscriber receives in addition to domain events:
/// idle heartbeats and terminal stream errors (§4.C).
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Event(StreamEvent),
    Heartbeat,
    Error(ShannonError2),
}

/// A `Clone`-able, string-only mirror of `ShannonError` for frames that
/// cross a channel boundary to potentially many subscribers.
#[derive(Debug, Clone)]
pub struct ShannonError2 {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ShannonError> for ShannonError2 {
    fn from(e: &ShannonError) -> Self {
        ShannonError2 {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<StreamFrame>,
    types: Vec<EventType>,
}

impl Subscriber {
    fn matches(&self, event: &StreamEvent) -> bool {
        self.types.is_empty() || self.types.contains(&event.event_type)
    }
}

/// Heartbeat cadence bounds per §4.C ("~10-20s depending on transport").
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(15);
/// Workflow-existence validation grace period (§4.C).
pub const WORKFLOW_VALIDATION_GRACE: Duration = Duration::from_secs(30);

pub type WorkflowExistsFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Fans out events to many concurrent subscribers; resumable by
/// `seq`/durable id (§4.C).
pub struct StreamingManager {
    store: Arc<EventStore>,
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_subscriber_id: AtomicU64,
    workflow_exists: WorkflowExistsFn,
    heartbeat_interval: Duration,
}

pub struct Subscription {
    pub receiver: mpsc::Receiver<StreamFrame>,
}

impl StreamingManager {
    pub fn new(store: Arc<EventStore>, workflow_exists: WorkflowExistsFn) -> Self {
        StreamingManager {
            store,
            subscribers: RwLock::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
            workflow_exists,
            heartbeat_interval: DEFAULT_HEARTBEAT,
        }
    }

    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Begins forwarding from `last_event_id`, filtered by `types`. Spawns a
    /// heartbeat ticker and a workflow-existence watchdog. Returns the
    /// receiving half plus an `unsubscribe` closure.
    pub async fn subscribe(
        self: &Arc<Self>,
        workflow_id: &str,
        types: Vec<EventType>,
        last_event_id: u64,
        buffer_size: usize,
    ) -> (mpsc::Receiver<StreamFrame>, Box<dyn FnOnce() + Send + 'static>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);

        let filter = ReadFilter {
            types: types.clone(),
        };
        match self.store.read(workflow_id, last_event_id, &filter).await {
            Ok(backlog) => {
                for event in backlog {
                    let _ = tx.try_send(StreamFrame::Event(event));
                }
            }
            Err(err) => {
                let _ = tx.try_send(StreamFrame::Error((&err).into()));
                let this = self.clone();
                let wf = workflow_id.to_string();
                tokio::spawn(async move {
                    this.unsubscribe(&wf, id).await;
                });
                return (rx, Box::new(move || {}));
            }
        }

        {
            let mut subs = self.subscribers.write().await;
            subs.entry(workflow_id.to_string()).or_default().push(Subscriber {
                id,
                tx: tx.clone(),
                types,
            });
        }

        self.spawn_heartbeat(workflow_id.to_string(), id, tx.clone());
        self.spawn_existence_watchdog(workflow_id.to_string(), id);

        let this = self.clone();
        let wf = workflow_id.to_string();
        (rx, Box::new(move || {
            tokio::spawn(async move {
                this.unsubscribe(&wf, id).await;
            });
        }))
    }

    fn spawn_heartbeat(self: &Arc<Self>, workflow_id: String, id: u64, tx: mpsc::Sender<StreamFrame>) {
        let interval = self.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.try_send(StreamFrame::Heartbeat).is_err() {
                    tracing::debug!(workflow_id, subscriber = id, "heartbeat target gone, stopping");
                    break;
                }
            }
        });
    }

    fn spawn_existence_watchdog(self: &Arc<Self>, workflow_id: String, id: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(WORKFLOW_VALIDATION_GRACE).await;
            if (this.workflow_exists)(&workflow_id) {
                return;
            }
            let has_events = {
                let subs = this.subscribers.read().await;
                subs.get(&workflow_id).map(|v| !v.is_empty()).unwrap_or(false)
            };
            if has_events {
                return;
            }
            if let Some(subs) = this.subscribers.read().await.get(&workflow_id) {
                if let Some(sub) = subs.iter().find(|s| s.id == id) {
                    let _ = sub
                        .tx
                        .try_send(StreamFrame::Error(ShannonError2 {
                            kind: "workflow_not_found",
                            message: format!("workflow {workflow_id} not found"),
                        }));
                }
            }
            this.unsubscribe(&workflow_id, id).await;
        });
    }

    async fn unsubscribe(&self, workflow_id: &str, id: u64) {
        let mut subs = self.subscribers.write().await;
        if let Some(list) = subs.get_mut(workflow_id) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                subs.remove(workflow_id);
            }
        }
    }

    /// Records the event in the store, then fans it out live. A slow
    /// subscriber never blocks producers: ephemeral events are dropped on a
    /// full channel with a warn log, critical events attempt a bounded
    /// blocking send and are logged at error severity if still dropped
    /// (§4.C).
    pub async fn publish(
        &self,
        workflow_id: &str,
        event_type: EventType,
        agent_id: Option<String>,
        message: Option<String>,
        payload: Option<serde_json::Value>,
    ) -> StreamEvent {
        let event = self
            .store
            .append(workflow_id, event_type, agent_id, message, payload)
            .await;

        let subs = self.subscribers.read().await;
        if let Some(list) = subs.get(workflow_id) {
            for sub in list.iter().filter(|s| s.matches(&event)) {
                if event.is_critical() {
                    match sub.tx.try_send(StreamFrame::Event(event.clone())) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(frame)) => {
                            match sub.tx.send_timeout(frame, Duration::from_millis(250)).await {
                                Ok(()) => {}
                                Err(_) => tracing::error!(
                                    workflow_id,
                                    seq = event.seq,
                                    event_type = event.event_type.as_str(),
                                    "dropped critical event: subscriber channel full"
                                ),
                            }
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {}
                    }
                } else if sub.tx.try_send(StreamFrame::Event(event.clone())).is_err() {
                    tracing::warn!(
                        workflow_id,
                        seq = event.seq,
                        event_type = event.event_type.as_str(),
                        "dropped ephemeral event: subscriber channel full"
                    );
                }
            }
        }
        event
    }

    /// Cancels all subscriptions and waits for readers to exit or `ctx` to
    /// expire (§4.C).
    pub async fn shutdown(&self, ctx: CancellationToken) {
        let mut subs = self.subscribers.write().await;
        for (_, list) in subs.drain() {
            drop(list);
        }
        ctx.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::InMemoryDurableStore;

    fn manager() -> Arc<StreamingManager> {
        let store = Arc::new(EventStore::new(Arc::new(InMemoryDurableStore::new())));
        Arc::new(StreamingManager::new(store, Arc::new(|_| true)))
    }

    #[tokio::test]
    async fn resume_yields_only_events_after_cursor() {
        let mgr = manager();
        for _ in 0..10 {
            mgr.publish("wf-1", EventType::Progress, None, None, None).await;
        }
        let (mut rx, _unsub) = mgr.subscribe("wf-1", vec![], 5, 16).await;
        let mut seqs = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let StreamFrame::Event(e) = frame {
                seqs.push(e.seq);
            }
        }
        assert_eq!(seqs, vec![6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn live_events_are_forwarded() {
        let mgr = manager();
        let (mut rx, _unsub) = mgr.subscribe("wf-1", vec![], 0, 16).await;
        mgr.publish("wf-1", EventType::AgentStarted, None, None, None).await;
        let frame = rx.recv().await.unwrap();
        match frame {
            StreamFrame::Event(e) => assert_eq!(e.event_type, EventType::AgentStarted),
            _ => panic!("expected event frame"),
        }
    }

    #[tokio::test]
    async fn type_filter_excludes_non_matching_events() {
        let mgr = manager();
        let (mut rx, _unsub) = mgr.subscribe("wf-1", vec![EventType::ToolInvoked], 0, 16).await;
        mgr.publish("wf-1", EventType::AgentStarted, None, None, None).await;
        mgr.publish("wf-1", EventType::ToolInvoked, None, None, None).await;
        let frame = rx.recv().await.unwrap();
        match frame {
            StreamFrame::Event(e) => assert_eq!(e.event_type, EventType::ToolInvoked),
            _ => panic!("expected event frame"),
        }
    }
}
