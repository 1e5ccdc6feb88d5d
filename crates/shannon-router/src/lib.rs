pub mod decompose;
pub mod select;

pub use decompose::Decomposer;
pub use select::{route, RouterDecision, RouterInput, StrategyKind};
