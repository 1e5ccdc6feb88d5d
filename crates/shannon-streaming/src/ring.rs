use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use shannon_types::StreamEvent;

/// Default ring capacity per workflow (§4.B).
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// A bounded, ordered in-memory event log for one workflow. `seq` is
/// assigned atomically per workflow and is strictly increasing and
/// contiguous from 1 (§8 invariant 2) for as long as the counter itself is
/// alive — the counter's TTL always exceeds the durable stream's TTL so a
/// slow workflow can never restart at a lower `seq` (§4.B invariant).
pub struct EventRing {
    capacity: usize,
    events: VecDeque<StreamEvent>,
    next_seq: AtomicU64,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        EventRing {
            capacity,
            events: VecDeque::with_capacity(capacity),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Reserves the next `seq` without inserting the event; callers that
    /// need the assigned `seq` before constructing the full `StreamEvent`
    /// (e.g. to stamp it) use this, then `push`.
    pub fn reserve_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn push(&mut self, event: StreamEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// The oldest `seq` still resident in the ring, if any.
    pub fn oldest_seq(&self) -> Option<u64> {
        self.events.front().map(|e| e.seq)
    }

    pub fn latest_seq(&self) -> Option<u64> {
        self.events.back().map(|e| e.seq)
    }

    /// All ring-resident events with `seq > from`.
    pub fn since(&self, from: u64) -> Vec<StreamEvent> {
        self.events
            .iter()
            .filter(|e| e.seq > from)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shannon_types::EventType;

    fn event(seq: u64) -> StreamEvent {
        StreamEvent {
            workflow_id: "wf-1".into(),
            event_type: EventType::Progress,
            agent_id: None,
            message: None,
            payload: None,
            timestamp: Utc::now(),
            seq,
            stream_id: None,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut ring = EventRing::new(2);
        ring.push(event(1));
        ring.push(event(2));
        ring.push(event(3));
        assert_eq!(ring.oldest_seq(), Some(2));
        assert_eq!(ring.latest_seq(), Some(3));
    }

    #[test]
    fn since_filters_strictly_greater() {
        let mut ring = EventRing::new(10);
        for seq in 1..=5 {
            ring.push(event(seq));
        }
        let tail = ring.since(3);
        assert_eq!(tail.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn seq_is_monotonic_and_contiguous() {
        let ring = EventRing::new(10);
        let seqs: Vec<u64> = (0..5).map(|_| ring.reserve_seq()).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }
}
