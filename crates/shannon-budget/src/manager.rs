use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use shannon_pricing::PricingConfig;
use shannon_types::{
    BudgetScope, BudgetState, ReservationToken, ShannonError, ShannonResult, TokenUsageRecord,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::idempotency::{IdempotencyTable, RecordOutcome};
use crate::rate::RateLimiter;

/// Identifying fields a `record` call needs beyond what the reservation
/// token carries, since a `BudgetScope` alone doesn't always name the
/// workflow/user/session triple a `TokenUsageRecord` row requires.
#[derive(Debug, Clone)]
pub struct UsageContext {
    pub workflow_id: String,
    pub task_id: Uuid,
    pub user_id: String,
    pub session_id: Option<String>,
    pub agent_id: String,
}

struct Inner {
    states: HashMap<String, BudgetState>,
    active_tokens: HashMap<Uuid, (String, u64)>,
    idempotency: IdempotencyTable,
    rate_limiter: RateLimiter,
}

/// Decides whether an agent step may proceed, enforces ceilings, and records
/// exactly-once usage (§4.D). Scoped accumulators are shared across
/// concurrent agents of a workflow, so every operation here is atomic
/// against other callers in the same scope via a single internal mutex.
pub struct BudgetManager {
    inner: Mutex<Inner>,
    pricing: PricingConfig,
}

impl BudgetManager {
    pub fn new(pricing: PricingConfig) -> Self {
        BudgetManager {
            inner: Mutex::new(Inner {
                states: HashMap::new(),
                active_tokens: HashMap::new(),
                idempotency: IdempotencyTable::new(),
                rate_limiter: RateLimiter::default_limiter(),
            }),
            pricing,
        }
    }

    /// Establishes or replaces the ceiling for a scope. Scopes with no
    /// explicit limit are treated as unlimited.
    pub async fn set_limit(&self, scope: &BudgetScope, limit: u64) {
        let mut inner = self.inner.lock().await;
        inner.states.insert(scope.key(), BudgetState::new(limit));
    }

    /// Atomically tests `used + reserved + estimate <= limit`; on success
    /// reserves and returns a token, else `BudgetExceeded` (§4.D).
    pub async fn check_and_reserve(&self, scope: BudgetScope, estimate: u64) -> ShannonResult<ReservationToken> {
        let mut inner = self.inner.lock().await;
        let key = scope.key();
        let state = inner.states.entry(key.clone()).or_insert_with(BudgetState::unlimited);

        if !state.can_reserve(estimate) {
            return Err(ShannonError::BudgetExceeded {
                scope,
                limit: state.limit,
                requested: state.used + state.reserved + estimate,
            });
        }

        state.reserved += estimate;
        let token = ReservationToken {
            scope,
            amount: estimate,
            token_id: Uuid::new_v4(),
        };
        inner.active_tokens.insert(token.token_id, (key, estimate));
        Ok(token)
    }

    /// Drops a reservation without recording usage (activity failure before
    /// the LLM call ran).
    pub async fn release(&self, token: ReservationToken) {
        let mut inner = self.inner.lock().await;
        if let Some((key, amount)) = inner.active_tokens.remove(&token.token_id) {
            if let Some(state) = inner.states.get_mut(&key) {
                state.reserved = state.reserved.saturating_sub(amount);
            }
        }
    }

    /// Converts a reservation into actual usage, computes cost, and
    /// persists one row keyed by `idempotency_key`; a duplicate key is a
    /// no-op. Zero-token executions are skipped unless `record_zero_token`
    /// is set (§4.D).
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        token: ReservationToken,
        ctx: UsageContext,
        actual_in: u32,
        actual_out: u32,
        model: &str,
        provider: &str,
        attempt: u32,
        record_zero_token: bool,
    ) -> ShannonResult<Option<TokenUsageRecord>> {
        let total = actual_in + actual_out;
        if total == 0 && !record_zero_token {
            self.release(token).await;
            return Ok(None);
        }

        let idempotency_key = shannon_types::usage::idempotency_key(&ctx.workflow_id, &ctx.agent_id, attempt);
        let cost = self.pricing.cost_for_split(model, actual_in as u64, actual_out as u64);

        let mut inner = self.inner.lock().await;
        let (key, reserved_amount) = inner
            .active_tokens
            .remove(&token.token_id)
            .unwrap_or_else(|| (token.scope.key(), token.amount));
        if let Some(state) = inner.states.get_mut(&key) {
            state.reserved = state.reserved.saturating_sub(reserved_amount);
            state.used = state.used.saturating_add(total as u64);
        }

        let record = TokenUsageRecord {
            task_id: ctx.task_id,
            user_id: ctx.user_id,
            session_id: ctx.session_id,
            agent_id: ctx.agent_id.clone(),
            model: model.to_string(),
            provider: provider.to_string(),
            prompt_tokens: actual_in as u64,
            completion_tokens: actual_out as u64,
            total_tokens: total as u64,
            cost_usd: cost,
            created_at: Utc::now(),
            idempotency_key,
            metadata: HashMap::new(),
        };

        match inner.idempotency.record(&ctx.workflow_id, &ctx.agent_id, record) {
            RecordOutcome::Recorded(row) => Ok(Some(row)),
            RecordOutcome::DuplicateKey(row) => Ok(Some(row)),
        }
    }

    /// Optional per-provider/model rate-limit admission; may impose a
    /// backoff (§4.D).
    pub async fn rate_aware_admit(&self, scope: &BudgetScope, model: &str) -> ShannonResult<()> {
        let mut inner = self.inner.lock().await;
        let key = scope.key();
        match inner.rate_limiter.admit(&key, model, Utc::now()) {
            Ok(()) => Ok(()),
            Err(until) => Err(ShannonError::UpstreamUnavailable {
                upstream: model.to_string(),
                reason: format!("rate limited until {until}"),
            }),
        }
    }

    pub async fn snapshot(&self, scope: &BudgetScope) -> Option<BudgetState> {
        let inner = self.inner.lock().await;
        inner.states.get(&scope.key()).copied()
    }
}

pub type SharedBudgetManager = Arc<BudgetManager>;

#[cfg(test)]
mod tests {
    use super::*;
    use shannon_pricing::{PricingConfig, PricingTableBuilder};
    use uuid::Uuid as UuidT;

    fn manager() -> BudgetManager {
        let table = PricingTableBuilder::default().build();
        BudgetManager::new(PricingConfig::new(table))
    }

    fn ctx(workflow_id: &str, agent_id: &str) -> UsageContext {
        UsageContext {
            workflow_id: workflow_id.into(),
            task_id: UuidT::new_v4(),
            user_id: "u-1".into(),
            session_id: None,
            agent_id: agent_id.into(),
        }
    }

    #[tokio::test]
    async fn reserve_then_exceed_limit_is_rejected() {
        let mgr = manager();
        let scope = BudgetScope::Task { task_id: UuidT::new_v4() };
        mgr.set_limit(&scope, 100).await;
        mgr.check_and_reserve(scope.clone(), 80).await.unwrap();
        let err = mgr.check_and_reserve(scope.clone(), 30).await;
        assert!(matches!(err, Err(ShannonError::BudgetExceeded { .. })));
    }

    #[tokio::test]
    async fn release_frees_the_reservation() {
        let mgr = manager();
        let scope = BudgetScope::Task { task_id: UuidT::new_v4() };
        mgr.set_limit(&scope, 100).await;
        let token = mgr.check_and_reserve(scope.clone(), 80).await.unwrap();
        mgr.release(token).await;
        assert!(mgr.check_and_reserve(scope.clone(), 80).await.is_ok());
    }

    #[tokio::test]
    async fn record_converts_reservation_to_used_and_computes_cost() {
        let mgr = manager();
        let scope = BudgetScope::Agent {
            task_id: UuidT::new_v4(),
            agent_id: "agent-1".into(),
        };
        mgr.set_limit(&scope, 1000).await;
        let token = mgr.check_and_reserve(scope.clone(), 500).await.unwrap();
        let row = mgr
            .record(token, ctx("wf-1", "agent-1"), 100, 50, "claude-3-haiku", "anthropic", 1, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.total_tokens, 150);
        let state = mgr.snapshot(&scope).await.unwrap();
        assert_eq!(state.used, 150);
        assert_eq!(state.reserved, 0);
    }

    #[tokio::test]
    async fn zero_token_is_skipped_unless_opted_in() {
        let mgr = manager();
        let scope = BudgetScope::Agent {
            task_id: UuidT::new_v4(),
            agent_id: "agent-1".into(),
        };
        let token = mgr.check_and_reserve(scope.clone(), 10).await.unwrap();
        let result = mgr
            .record(token, ctx("wf-1", "agent-1"), 0, 0, "claude-3-haiku", "anthropic", 1, false)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn duplicate_attempt_does_not_double_record() {
        let mgr = manager();
        let scope = BudgetScope::Agent {
            task_id: UuidT::new_v4(),
            agent_id: "agent-1".into(),
        };
        mgr.set_limit(&scope, 1000).await;
        let token_a = mgr.check_and_reserve(scope.clone(), 200).await.unwrap();
        mgr.record(token_a, ctx("wf-1", "agent-1"), 100, 20, "gpt-4o", "openai", 1, false)
            .await
            .unwrap();

        let token_b = mgr.check_and_reserve(scope.clone(), 200).await.unwrap();
        let row = mgr
            .record(token_b, ctx("wf-1", "agent-1"), 100, 20, "gpt-4o", "openai", 1, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.total_tokens, 120);
        let state = mgr.snapshot(&scope).await.unwrap();
        assert_eq!(state.used, 240, "second record with a distinct reservation still accrues usage");
    }
}
