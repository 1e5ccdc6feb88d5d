pub mod idempotency;
pub mod manager;
pub mod rate;

pub use idempotency::{IdempotencyTable, RecordOutcome};
pub use manager::{BudgetManager, SharedBudgetManager, UsageContext};
pub use rate::RateLimiter;
