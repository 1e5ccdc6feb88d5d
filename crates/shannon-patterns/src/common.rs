use std::sync::Arc;

use shannon_budget::{BudgetManager, UsageContext};
use shannon_streaming::StreamingManager;
use shannon_types::{
    AgentExecutionResult, AgentExecutor, BudgetScope, EventType, ModelTier, ShannonResult, ToolExecution,
    ToolExecutor,
};
use uuid::Uuid;

/// Budget/model knobs shared by every pattern (§4.F preamble). `budget_agent_max`
/// mirrors `Workflow::budgeted_per_agent`: a step still goes through
/// `BudgetManager` either way, but the scope only has a binding ceiling when
/// the caller established one with `BudgetManager::set_limit`.
#[derive(Debug, Clone)]
pub struct PatternOptions {
    pub model_tier: ModelTier,
    pub record_zero_token: bool,
    pub fail_fast: bool,
    /// Conservative per-step token estimate reserved before the executor
    /// call is made, so an over-budget scope is rejected before spending
    /// anything rather than after (§4.D `check_and_reserve`).
    pub estimated_tokens_per_step: u64,
}

impl Default for PatternOptions {
    fn default() -> Self {
        PatternOptions {
            model_tier: ModelTier::Medium,
            record_zero_token: false,
            fail_fast: false,
            estimated_tokens_per_step: 4000,
        }
    }
}

/// Everything a pattern needs to run one agent step: the external
/// collaborators (§6.3) plus workflow identity for budget/event recording.
#[derive(Clone)]
pub struct PatternContext {
    pub executor: Arc<dyn AgentExecutor>,
    pub tool_executor: Option<Arc<dyn ToolExecutor>>,
    pub streaming: Option<Arc<StreamingManager>>,
    pub budget: Option<Arc<BudgetManager>>,
    pub workflow_id: String,
    pub task_id: Uuid,
    pub user_id: String,
    pub session_id: Option<String>,
    pub options: PatternOptions,
}

/// The outcome of a full pattern run: the synthesized response plus every
/// recorded agent step, in the order callers should attribute cost to.
#[derive(Debug, Clone)]
pub struct PatternOutput {
    pub response: String,
    pub steps: Vec<AgentExecutionResult>,
    pub confidence: Option<f64>,
}

impl PatternContext {
    /// Runs one agent call, reserving against `BudgetManager` *before*
    /// calling the executor so an over-budget scope is rejected without
    /// spending anything (§4.D `check_and_reserve`), then truing the
    /// reservation up to the provider-reported actuals via `record`.
    /// Emits the `AGENT_STARTED`/`AGENT_COMPLETED` pair every step must
    /// produce (§4.F preamble).
    #[tracing::instrument(name = "agent_step", skip(self, prompt, tools), fields(workflow_id = %self.workflow_id))]
    pub async fn run_agent_step(
        &self,
        agent_id: &str,
        prompt: &str,
        tools: Option<&[String]>,
        attempt: u32,
    ) -> ShannonResult<AgentExecutionResult> {
        self.emit(EventType::AgentStarted, agent_id, &format!("starting {agent_id}"))
            .await;

        let started = std::time::Instant::now();
        let result = self.execute_and_account(agent_id, prompt, tools, attempt, started).await;

        if let Some(message) = &result.error {
            tracing::warn!(agent_id, message, "agent step failed");
            self.emit(EventType::AgentFailed, agent_id, message).await;
        } else {
            tracing::debug!(agent_id, total_tokens = result.total_tokens, "agent step completed");
            self.emit(EventType::AgentCompleted, agent_id, &result.response)
                .await;
        }
        Ok(result)
    }

    /// A rejected reservation or a failed executor call both land in
    /// `AgentExecutionResult::error` rather than propagating — callers
    /// (e.g. Parallel) decide whether that aborts sibling steps via
    /// `PatternOptions::fail_fast` (§4.F.1).
    async fn execute_and_account(
        &self,
        agent_id: &str,
        prompt: &str,
        tools: Option<&[String]>,
        attempt: u32,
        started: std::time::Instant,
    ) -> AgentExecutionResult {
        let failed = |message: String| AgentExecutionResult {
            agent_id: agent_id.to_string(),
            response: String::new(),
            model_used: String::new(),
            provider: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            tool_executions: Vec::new(),
            error: Some(message),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        let reservation = match &self.budget {
            Some(budget) => {
                let scope = BudgetScope::Agent {
                    task_id: self.task_id,
                    agent_id: agent_id.to_string(),
                };
                match budget.check_and_reserve(scope, self.options.estimated_tokens_per_step).await {
                    Ok(token) => Some(token),
                    Err(err) => return failed(err.to_string()),
                }
            }
            None => None,
        };

        let outcome = self.executor.execute(prompt, tools, self.options.model_tier, None).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                if let (Some(budget), Some(token)) = (&self.budget, reservation) {
                    budget.release(token).await;
                }
                return failed(err.to_string());
            }
        };

        let total_tokens = outcome.input_tokens + outcome.output_tokens;
        if let (Some(budget), Some(token)) = (&self.budget, reservation) {
            let usage_ctx = UsageContext {
                workflow_id: self.workflow_id.clone(),
                task_id: self.task_id,
                user_id: self.user_id.clone(),
                session_id: self.session_id.clone(),
                agent_id: agent_id.to_string(),
            };
            if let Err(err) = budget
                .record(
                    token,
                    usage_ctx,
                    outcome.input_tokens as u32,
                    outcome.output_tokens as u32,
                    &outcome.model_used,
                    &outcome.provider,
                    attempt,
                    self.options.record_zero_token,
                )
                .await
            {
                return failed(err.to_string());
            }
        }

        AgentExecutionResult {
            agent_id: agent_id.to_string(),
            response: outcome.text,
            model_used: outcome.model_used,
            provider: outcome.provider,
            input_tokens: outcome.input_tokens,
            output_tokens: outcome.output_tokens,
            total_tokens,
            tool_executions: Vec::new(),
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Invokes a single tool via the `ToolExecutor` collaborator, emitting
    /// the `TOOL_INVOKED`/`TOOL_OBSERVATION` pair (§4.F preamble).
    pub async fn run_tool(&self, agent_id: &str, name: &str, params: serde_json::Value) -> ToolExecution {
        self.emit(EventType::ToolInvoked, agent_id, &format!("invoking {name}")).await;
        let started = std::time::Instant::now();
        let Some(executor) = &self.tool_executor else {
            return ToolExecution {
                tool_name: name.to_string(),
                params,
                success: false,
                output: None,
                error: Some("no tool executor configured".to_string()),
                duration_ms: 0,
            };
        };
        let outcome = executor.invoke(name, params.clone(), self.session_id.as_deref()).await;
        let execution = match outcome {
            Ok(outcome) => ToolExecution {
                tool_name: name.to_string(),
                params,
                success: outcome.success,
                output: Some(outcome.output),
                error: outcome.error,
                duration_ms: outcome.duration_ms,
            },
            Err(err) => ToolExecution {
                tool_name: name.to_string(),
                params,
                success: false,
                output: None,
                error: Some(err.to_string()),
                duration_ms: started.elapsed().as_millis() as u64,
            },
        };
        let event_type = if execution.success {
            EventType::ToolObservation
        } else {
            EventType::ToolError
        };
        self.emit(event_type, agent_id, execution.output.as_deref().unwrap_or("")).await;
        execution
    }

    pub async fn emit(&self, event_type: EventType, agent_id: &str, message: &str) {
        if let Some(streaming) = &self.streaming {
            streaming
                .publish(
                    &self.workflow_id,
                    event_type,
                    Some(agent_id.to_string()),
                    Some(message.to_string()),
                    None,
                )
                .await;
        }
    }
}
