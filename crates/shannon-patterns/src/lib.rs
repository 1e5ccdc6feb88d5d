pub mod common;
pub mod cot;
pub mod debate;
pub mod hybrid;
pub mod parallel;
pub mod react;
pub mod reflection;
pub mod sequential;
pub mod tot;

#[cfg(any(test, feature = "testing"))]
pub mod test_support;

pub use common::{PatternContext, PatternOptions, PatternOutput};
pub use cot::ChainOfThoughtConfig;
pub use debate::DebateConfig;
pub use hybrid::{Workspace, DEFAULT_P2P_TIMEOUT};
pub use parallel::ParallelConfig;
pub use react::ReactConfig;
pub use reflection::ReflectionConfig;
pub use tot::{ScoringMode, TreeOfThoughtsConfig};
