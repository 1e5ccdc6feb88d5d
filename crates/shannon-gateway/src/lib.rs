//! HTTP surface over the router/strategies/engine stack (§6.1).
//!
//! `build_app` assembles the full service from a concrete `AgentExecutor`
//! and `ToolExecutor`; `AppState` is the only shared mutable state, held
//! behind an `Arc` the same way the rest of the workspace threads shared
//! collaborators through `PatternContext`.

pub mod decomposer;
pub mod http;
pub mod state;

use std::sync::Arc;

use axum::Router;
use shannon_router::Decomposer;
use shannon_streaming::StreamingManager;
use shannon_types::{AgentExecutor, ToolExecutor};
use tower_http::cors::CorsLayer;

pub use decomposer::AgentDecomposer;
pub use state::AppState;

pub fn build_app(state: Arc<AppState>) -> Router {
    http::router(state).layer(CorsLayer::permissive())
}

pub fn build_state(
    executor: Arc<dyn AgentExecutor>,
    tool_executor: Arc<dyn ToolExecutor>,
    decomposer: Arc<dyn Decomposer>,
    streaming: Arc<StreamingManager>,
    pricing: shannon_pricing::PricingConfig,
) -> Arc<AppState> {
    Arc::new(AppState::new(executor, tool_executor, decomposer, streaming, pricing))
}
