use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use shannon_providers::{HttpAgentExecutor, ProviderConfig};
use shannon_streaming::{EventStore, InMemoryDurableStore, StreamingManager};
use shannon_tools::DefaultToolExecutor;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shannon-engine")]
#[command(about = "Headless Shannon orchestration engine and HTTP gateway")]
struct Cli {
    #[arg(long, env = "SHANNON_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "SHANNON_PORT", default_value_t = 8080)]
    port: u16,

    /// JSON file describing the small/medium/large provider endpoints
    /// (see `shannon_providers::ProviderConfig`). Falls back to a
    /// single-tier localhost stub when unset, for local smoke-testing.
    #[arg(long, env = "SHANNON_PROVIDER_CONFIG")]
    provider_config: Option<String>,

    /// Base URL of a web-search backend implementing the tool's expected
    /// `{query}` -> results contract. Omitting it disables `web_search`.
    #[arg(long, env = "SHANNON_SEARCH_ENDPOINT")]
    search_endpoint: Option<String>,
}

fn load_provider_config(path: Option<&str>) -> anyhow::Result<ProviderConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading provider config {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing provider config {path}"))
        }
        None => {
            let raw = serde_json::json!({
                "small": {"provider": "local", "base_url": "http://127.0.0.1:11434/v1", "api_key": null, "model": "local-small"},
                "medium": {"provider": "local", "base_url": "http://127.0.0.1:11434/v1", "api_key": null, "model": "local-medium"},
                "large": {"provider": "local", "base_url": "http://127.0.0.1:11434/v1", "api_key": null, "model": "local-large"},
            });
            Ok(serde_json::from_value(raw)?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (_guard, _info) = shannon_observability::init_process_logging(
        shannon_observability::ProcessKind::Gateway,
        &shannon_observability::canonical_logs_dir_from_root(&std::env::current_dir()?),
        14,
    )?;

    let cli = Cli::parse();

    let provider_config = load_provider_config(cli.provider_config.as_deref())?;
    let executor: Arc<dyn shannon_types::AgentExecutor> = Arc::new(HttpAgentExecutor::new(provider_config));
    let tool_executor: Arc<dyn shannon_types::ToolExecutor> = Arc::new(DefaultToolExecutor::new(cli.search_endpoint));
    let decomposer: Arc<dyn shannon_router::Decomposer> = Arc::new(shannon_gateway::AgentDecomposer::new(executor.clone()));

    let event_store = Arc::new(EventStore::new(Arc::new(InMemoryDurableStore::new())));
    let streaming = Arc::new(StreamingManager::new(event_store, Arc::new(|_workflow_id: &str| true)));

    let pricing_table = shannon_pricing::PricingTable::builder().build();
    let pricing = shannon_pricing::PricingConfig::new(pricing_table);

    let state = shannon_gateway::build_state(executor, tool_executor, decomposer, streaming, pricing);
    let app = shannon_gateway::build_app(state);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!(%addr, "starting shannon-engine gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
