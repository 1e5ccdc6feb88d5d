//! `AgentExecutor` (§6.3) over OpenAI-compatible chat-completion endpoints,
//! with one configured endpoint per `ModelTier` and the `UpstreamUnavailable`/
//! `ModelUnavailable` retry/fallback split from §7.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shannon_types::{AgentExecutionOutcome, AgentExecutor, ModelTier, ShannonError, ShannonResult, ToolCallRequest};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEndpoint {
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub small: ProviderEndpoint,
    pub medium: ProviderEndpoint,
    pub large: ProviderEndpoint,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    4
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Default)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    function: ChatToolCallFunction,
}

#[derive(Deserialize)]
struct ChatToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Dispatches `execute` to one of three configured endpoints by `model_tier`
/// (§6.1 `model_tier ∈ {small,medium,large}`), retrying transient upstream
/// failures with capped exponential backoff before giving up with
/// `UpstreamUnavailable`.
pub struct HttpAgentExecutor {
    client: Client,
    config: ProviderConfig,
}

impl HttpAgentExecutor {
    pub fn new(config: ProviderConfig) -> Self {
        HttpAgentExecutor { client: Client::new(), config }
    }

    fn endpoint_for(&self, tier: ModelTier) -> &ProviderEndpoint {
        match tier {
            ModelTier::Small => &self.config.small,
            ModelTier::Medium => &self.config.medium,
            ModelTier::Large => &self.config.large,
        }
    }

    async fn send_once(&self, endpoint: &ProviderEndpoint, prompt: &str, tools: Option<&[String]>, max_tokens: Option<u32>) -> ShannonResult<ChatResponse> {
        let body = ChatRequest {
            model: &endpoint.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens,
            tools: tools.map(|names| {
                names
                    .iter()
                    .map(|name| json!({"type": "function", "function": {"name": name}}))
                    .collect()
            }),
        };

        let mut request = self.client.post(format!("{}/chat/completions", endpoint.base_url)).json(&body);
        if let Some(key) = &endpoint.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            ShannonError::UpstreamUnavailable { upstream: endpoint.provider.clone(), reason: e.to_string() }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ShannonError::ModelUnavailable { model: endpoint.model.clone(), provider: endpoint.provider.clone() })
            }
            status if status.is_server_error() => {
                Err(ShannonError::UpstreamUnavailable { upstream: endpoint.provider.clone(), reason: status.to_string() })
            }
            status if !status.is_success() => {
                Err(ShannonError::Internal(anyhow::anyhow!("{} returned {status}", endpoint.provider)))
            }
            _ => response
                .json::<ChatResponse>()
                .await
                .map_err(|e| ShannonError::Internal(anyhow::anyhow!("malformed response from {}: {e}", endpoint.provider))),
        }
    }
}

#[async_trait]
impl AgentExecutor for HttpAgentExecutor {
    async fn execute(
        &self,
        prompt: &str,
        tools: Option<&[String]>,
        model_tier: ModelTier,
        max_tokens: Option<u32>,
    ) -> ShannonResult<AgentExecutionOutcome> {
        let endpoint = self.endpoint_for(model_tier);
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;

        for attempt in 0..self.config.max_attempts {
            match self.send_once(endpoint, prompt, tools, max_tokens).await {
                Ok(response) => {
                    let choice = response.choices.into_iter().next().unwrap_or_default_choice();
                    let usage = response.usage.unwrap_or_default();
                    let tool_calls = choice
                        .message
                        .tool_calls
                        .into_iter()
                        .map(|call| ToolCallRequest {
                            name: call.function.name,
                            arguments: serde_json::from_str(&call.function.arguments).unwrap_or(serde_json::Value::Null),
                        })
                        .collect();

                    return Ok(AgentExecutionOutcome {
                        text: choice.message.content.unwrap_or_default(),
                        input_tokens: usage.prompt_tokens,
                        output_tokens: usage.completion_tokens,
                        model_used: endpoint.model.clone(),
                        provider: endpoint.provider.clone(),
                        tool_calls,
                    });
                }
                Err(e @ ShannonError::ModelUnavailable { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(attempt, provider = %endpoint.provider, error = %e, "provider call failed, retrying");
                    last_err = Some(e);
                    if attempt + 1 < self.config.max_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ShannonError::UpstreamUnavailable {
            upstream: endpoint.provider.clone(),
            reason: "exhausted retries".to_string(),
        }))
    }
}

trait DefaultChoice {
    fn unwrap_or_default_choice(self) -> ChatChoice;
}

impl DefaultChoice for Option<ChatChoice> {
    fn unwrap_or_default_choice(self) -> ChatChoice {
        self.unwrap_or(ChatChoice { message: ChatResponseMessage::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> ProviderEndpoint {
        ProviderEndpoint { provider: "test".to_string(), base_url: "http://127.0.0.1:0".to_string(), api_key: None, model: "test-model".to_string() }
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_upstream_unavailable() {
        let config = ProviderConfig { small: endpoint(), medium: endpoint(), large: endpoint(), max_attempts: 1 };
        let executor = HttpAgentExecutor::new(config);
        let result = executor.execute("hello", None, ModelTier::Small, None).await;
        assert!(matches!(result, Err(ShannonError::UpstreamUnavailable { .. })));
    }
}
