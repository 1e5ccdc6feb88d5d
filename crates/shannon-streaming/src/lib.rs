pub mod durable;
pub mod manager;
pub mod ring;
pub mod store;

pub use durable::{DurableStore, InMemoryDurableStore, SharedDurableStore};
pub use manager::{
    ShannonError2, StreamFrame, StreamingManager, Subscription, WorkflowExistsFn,
    DEFAULT_HEARTBEAT, WORKFLOW_VALIDATION_GRACE,
};
pub use ring::{EventRing, DEFAULT_RING_CAPACITY};
pub use store::{EventStore, ReadFilter};
