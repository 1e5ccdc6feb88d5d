use async_trait::async_trait;
use shannon_types::{AgentExecutionOutcome, AgentExecutor, ModelTier, ShannonResult, Subtask};
use uuid::Uuid;

use crate::common::{PatternContext, PatternOptions};

/// Deterministic stand-in for a real provider: echoes the prompt back as the
/// response and reports a fixed token count, so pattern tests can assert on
/// ordering/counting without depending on any real model.
pub struct EchoExecutor;

#[async_trait]
impl AgentExecutor for EchoExecutor {
    async fn execute(
        &self,
        prompt: &str,
        _tools: Option<&[String]>,
        _model_tier: ModelTier,
        _max_tokens: Option<u32>,
    ) -> ShannonResult<AgentExecutionOutcome> {
        Ok(AgentExecutionOutcome {
            text: format!("echo: {prompt}"),
            input_tokens: 10,
            output_tokens: 5,
            model_used: "stub-model".to_string(),
            provider: "stub".to_string(),
            tool_calls: vec![],
        })
    }
}

pub fn stub_context() -> PatternContext {
    PatternContext {
        executor: std::sync::Arc::new(EchoExecutor),
        tool_executor: None,
        streaming: None,
        budget: None,
        workflow_id: "wf-test".to_string(),
        task_id: Uuid::new_v4(),
        user_id: "user-1".to_string(),
        session_id: None,
        options: PatternOptions::default(),
    }
}

pub fn stub_subtask(id: &str) -> Subtask {
    Subtask {
        id: id.to_string(),
        description: format!("do {id}"),
        depends_on: Vec::new(),
        suggested_tools: Vec::new(),
        tool_parameters: None,
        produces: Vec::new(),
        consumes: Vec::new(),
    }
}
