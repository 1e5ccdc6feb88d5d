pub mod common;
pub mod dag;
pub mod exploratory;
pub mod react_strategy;
pub mod research;
pub mod scientific;
pub mod simple;

pub use common::StrategyOutput;
pub use dag::DagConfig;
pub use exploratory::ExploratoryConfig;
pub use react_strategy::ReactStrategyConfig;
pub use research::{ResearchConfig, ResearchStrategyTier};

use shannon_patterns::PatternContext;
use shannon_router::{Decomposer, RouterDecision, StrategyKind};
use shannon_types::{MemoryStore, ShannonResult};

/// Per-strategy knobs, keyed by strategy so a caller can override just the
/// one `dispatch` is about to reach.
#[derive(Debug, Clone, Default)]
pub struct StrategyConfigs {
    pub dag: DagConfig,
    pub react: ReactStrategyConfig,
    pub research: ResearchConfig,
    pub exploratory: ExploratoryConfig,
}

/// Runs the strategy a router decision selected (§4.G/§4.H boundary: the
/// router decides *which*, this runs *what*).
pub async fn dispatch(
    ctx: &PatternContext,
    query: &str,
    decision: &RouterDecision,
    decomposer: &dyn Decomposer,
    memory: Option<(&dyn MemoryStore, &str)>,
    configs: &StrategyConfigs,
    attempt: u32,
) -> ShannonResult<StrategyOutput> {
    match decision.strategy {
        StrategyKind::Simple => simple::run(ctx, query, attempt).await,
        StrategyKind::DagParallel | StrategyKind::DagHybrid => {
            dag::run(ctx, query, &decision.plan, decision.strategy, &configs.dag, attempt).await
        }
        StrategyKind::ReactStrategy => react_strategy::run(ctx, query, &configs.react, attempt).await,
        StrategyKind::Research => research::run(ctx, query, decomposer, memory, &configs.research, attempt).await,
        StrategyKind::Exploratory => exploratory::run(ctx, query, &configs.exploratory, attempt).await,
        StrategyKind::Scientific => scientific::run(ctx, query, attempt).await,
    }
}
