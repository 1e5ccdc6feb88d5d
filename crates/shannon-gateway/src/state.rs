use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shannon_budget::BudgetManager;
use shannon_engine::Engine;
use shannon_pricing::PricingConfig;
use shannon_router::Decomposer;
use shannon_strategies::StrategyConfigs;
use shannon_streaming::StreamingManager;
use shannon_types::{AgentExecutor, ToolExecutor, WorkflowSnapshot};
use tokio::sync::{Mutex, RwLock};

pub const IDEMPOTENCY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything a request handler needs, shared across the process (§6.1).
/// `workflows`/`idempotency_keys` are the in-memory stand-in for the
/// persisted tables §6.4 describes; a production deployment backs both
/// with the relational store `SessionStore`/`WorkflowSnapshot` already
/// model the shape of.
pub struct AppState {
    pub engine: Arc<Engine>,
    pub streaming: Arc<StreamingManager>,
    pub executor: Arc<dyn AgentExecutor>,
    pub tool_executor: Arc<dyn ToolExecutor>,
    pub budget: Arc<BudgetManager>,
    pub decomposer: Arc<dyn Decomposer>,
    pub pricing: PricingConfig,
    pub configs: StrategyConfigs,
    pub workflows: RwLock<HashMap<String, WorkflowSnapshot>>,
    pub idempotency_keys: Mutex<HashMap<String, (DateTime<Utc>, String)>>,
}

impl AppState {
    pub fn new(
        executor: Arc<dyn AgentExecutor>,
        tool_executor: Arc<dyn ToolExecutor>,
        decomposer: Arc<dyn Decomposer>,
        streaming: Arc<StreamingManager>,
        pricing: PricingConfig,
    ) -> Self {
        AppState {
            engine: Arc::new(Engine::new()),
            streaming,
            executor,
            tool_executor,
            budget: Arc::new(BudgetManager::new(pricing.clone())),
            decomposer,
            pricing,
            configs: StrategyConfigs::default(),
            workflows: RwLock::new(HashMap::new()),
            idempotency_keys: Mutex::new(HashMap::new()),
        }
    }

    /// Dedup lookup for `Idempotency-Key` (§6.1): a key seen within the
    /// last 24h returns the workflow id it was already bound to.
    pub async fn idempotent_workflow_id(&self, key: &str) -> Option<String> {
        let mut keys = self.idempotency_keys.lock().await;
        keys.retain(|_, (seen_at, _)| Utc::now().signed_duration_since(*seen_at).to_std().unwrap_or_default() < IDEMPOTENCY_WINDOW);
        keys.get(key).map(|(_, workflow_id)| workflow_id.clone())
    }

    pub async fn bind_idempotency_key(&self, key: &str, workflow_id: &str) {
        self.idempotency_keys.lock().await.insert(key.to_string(), (Utc::now(), workflow_id.to_string()));
    }
}
