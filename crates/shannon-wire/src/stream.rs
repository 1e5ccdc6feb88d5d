use serde::{Deserialize, Serialize};
use shannon_types::{EventType, StreamEvent};

/// The resume cursor a subscriber supplies as `last_event_id` (§6.1):
/// either the numeric in-ring `seq`, or a durable-store offset id for
/// resuming past a ring restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastEventId {
    Seq(u64),
    Durable(String),
}

impl LastEventId {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<u64>() {
            Ok(seq) => LastEventId::Seq(seq),
            Err(_) => LastEventId::Durable(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamSubscribeParams {
    pub workflow_id: String,
    #[serde(default)]
    pub types: Vec<EventType>,
    #[serde(default)]
    pub last_event_id: Option<LastEventId>,
}

impl StreamSubscribeParams {
    pub fn parse_types(raw: &str) -> Vec<EventType> {
        raw.split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| serde_json::from_value(serde_json::Value::String(s.trim().to_string())).ok())
            .collect()
    }
}

/// The on-wire envelope for a streamed event (SSE/WebSocket/gRPC-stream
/// frame), carrying the domain `StreamEvent` plus a framing discriminant for
/// out-of-band control frames (heartbeats, terminal errors).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum StreamFrame {
    Event(StreamEvent),
    Heartbeat { at: chrono::DateTime<chrono::Utc> },
    Error { code: String, message: String },
}
