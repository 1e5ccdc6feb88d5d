//! Durable workflow engine contract (§4.I): wraps every non-deterministic
//! operation a strategy workflow performs — activity dispatch, timers,
//! signal waits, version gates — behind a `WorkflowContext`, and gives the
//! replay harness (§8.3) a way to prove that re-running workflow code
//! against a recorded history reproduces the same invocations and result.

pub mod context;
pub mod engine;
pub mod history;
pub mod replay;
pub mod signals;

pub use context::WorkflowContext;
pub use engine::Engine;
pub use history::{History, HistoryEntry};
pub use replay::{replay, ReplayReport};
pub use signals::SignalBus;
