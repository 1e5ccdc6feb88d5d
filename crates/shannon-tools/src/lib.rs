//! `ToolExecutor` (§6.3): web search/fetch and session-workspace file access,
//! each bounded by a per-tool timeout (§5 tool activity deadline, default
//! 30 s).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shannon_types::{ShannonError, ShannonResult, ToolExecutor, ToolInvocationOutcome};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// The built-in tool set a strategy's `suggested_tools` can name:
/// `web_search`, `web_fetch`, `read_file`, `write_file`.
pub struct DefaultToolExecutor {
    client: Client,
    search_endpoint: Option<String>,
    timeout: Duration,
}

impl DefaultToolExecutor {
    pub fn new(search_endpoint: Option<String>) -> Self {
        DefaultToolExecutor { client: Client::new(), search_endpoint, timeout: DEFAULT_TOOL_TIMEOUT }
    }

    async fn dispatch(&self, name: &str, params: Value, session_workspace: Option<&str>) -> ShannonResult<String> {
        match name {
            "web_search" => self.web_search(params).await,
            "web_fetch" => self.web_fetch(params).await,
            "read_file" => self.read_file(params, session_workspace).await,
            "write_file" => self.write_file(params, session_workspace).await,
            other => Err(ShannonError::Internal(anyhow::anyhow!("unknown tool: {other}"))),
        }
    }

    async fn web_search(&self, params: Value) -> ShannonResult<String> {
        let query = params.get("query").and_then(Value::as_str).ok_or_else(|| {
            ShannonError::Internal(anyhow::anyhow!("web_search requires a \"query\" string"))
        })?;
        let Some(endpoint) = &self.search_endpoint else {
            return Err(ShannonError::Internal(anyhow::anyhow!("no web_search backend configured")));
        };

        let response = self
            .client
            .get(endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ShannonError::UpstreamUnavailable { upstream: "web_search".to_string(), reason: e.to_string() })?;

        response
            .text()
            .await
            .map_err(|e| ShannonError::UpstreamUnavailable { upstream: "web_search".to_string(), reason: e.to_string() })
    }

    async fn web_fetch(&self, params: Value) -> ShannonResult<String> {
        let url = params.get("url").and_then(Value::as_str).ok_or_else(|| {
            ShannonError::Internal(anyhow::anyhow!("web_fetch requires a \"url\" string"))
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ShannonError::UpstreamUnavailable { upstream: "web_fetch".to_string(), reason: e.to_string() })?;

        let body = response
            .text()
            .await
            .map_err(|e| ShannonError::UpstreamUnavailable { upstream: "web_fetch".to_string(), reason: e.to_string() })?;

        Ok(html2md::parse_html(&body))
    }

    async fn read_file(&self, params: Value, session_workspace: Option<&str>) -> ShannonResult<String> {
        let path = resolve_workspace_path(params.get("path").and_then(Value::as_str), session_workspace)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ShannonError::Internal(anyhow::anyhow!("read_file failed for {}: {e}", path.display())))
    }

    async fn write_file(&self, params: Value, session_workspace: Option<&str>) -> ShannonResult<String> {
        let path = resolve_workspace_path(params.get("path").and_then(Value::as_str), session_workspace)?;
        let content = params.get("content").and_then(Value::as_str).unwrap_or_default();
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ShannonError::Internal(anyhow::anyhow!("write_file failed for {}: {e}", path.display())))?;
        Ok(format!("wrote {} bytes to {}", content.len(), path.display()))
    }
}

/// Joins `path` onto `session_workspace` and rejects anything that escapes
/// it, so a tool call can't read or write outside the session's sandbox.
fn resolve_workspace_path(path: Option<&str>, session_workspace: Option<&str>) -> ShannonResult<PathBuf> {
    let path = path.ok_or_else(|| ShannonError::Internal(anyhow::anyhow!("missing \"path\"")))?;
    let workspace = session_workspace.ok_or_else(|| ShannonError::Internal(anyhow::anyhow!("no session workspace configured")))?;

    let candidate = Path::new(workspace).join(path);
    if candidate.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(ShannonError::Internal(anyhow::anyhow!("path escapes session workspace: {path}")));
    }
    Ok(candidate)
}

#[async_trait]
impl ToolExecutor for DefaultToolExecutor {
    async fn invoke(&self, name: &str, params: Value, session_workspace: Option<&str>) -> ShannonResult<ToolInvocationOutcome> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.dispatch(name, params, session_workspace)).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Ok(output)) => Ok(ToolInvocationOutcome { success: true, output, error: None, duration_ms }),
            Ok(Err(e)) => Ok(ToolInvocationOutcome { success: false, output: String::new(), error: Some(e.to_string()), duration_ms }),
            Err(_) => Ok(ToolInvocationOutcome {
                success: false,
                output: String::new(),
                error: Some(format!("{name} timed out after {}ms", self.timeout.as_millis())),
                duration_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_file_rejects_path_outside_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let executor = DefaultToolExecutor::new(None);
        let outcome = executor
            .invoke("read_file", serde_json::json!({"path": "../../etc/passwd"}), Some(dir.path().to_str().unwrap()))
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn write_then_read_round_trips_within_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().to_str().unwrap();
        let executor = DefaultToolExecutor::new(None);

        let write = executor
            .invoke("write_file", serde_json::json!({"path": "notes.txt", "content": "hello"}), Some(workspace))
            .await
            .unwrap();
        assert!(write.success);

        let read = executor.invoke("read_file", serde_json::json!({"path": "notes.txt"}), Some(workspace)).await.unwrap();
        assert!(read.success);
        assert_eq!(read.output, "hello");
    }

    #[tokio::test]
    async fn web_search_without_backend_fails_cleanly() {
        let executor = DefaultToolExecutor::new(None);
        let outcome = executor.invoke("web_search", serde_json::json!({"query": "rust async"}), None).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_as_failure_not_a_panic() {
        let executor = DefaultToolExecutor::new(None);
        let outcome = executor.invoke("delete_everything", serde_json::json!({}), None).await.unwrap();
        assert!(!outcome.success);
    }
}
