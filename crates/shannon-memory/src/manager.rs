use std::sync::Arc;

use chrono::Utc;
use shannon_types::{
    AgentExecutor, HistoryMessage, MemoryItem, MemoryQueryFilter, MemorySource, MemoryStore, MessageRole,
    ModelTier, Session, SessionStore, ShannonResult,
};

use crate::chunking::{windows, Tokenizer};
use crate::error::MemoryError;

/// Retrieval sizing for `fetch_hierarchical` (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct RetrievalLimits {
    pub k_recent: usize,
    pub k_semantic: usize,
    pub similarity_threshold: f32,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        RetrievalLimits {
            k_recent: 5,
            k_semantic: 5,
            similarity_threshold: 0.75,
        }
    }
}

/// Message-count / token-estimate thresholds above which a session's history
/// is compressed, scaled by model tier so a larger-context model tolerates a
/// longer history before summarizing (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct CompressionThresholds {
    pub small_tokens: u64,
    pub medium_tokens: u64,
    pub large_tokens: u64,
}

impl Default for CompressionThresholds {
    fn default() -> Self {
        CompressionThresholds {
            small_tokens: 3_000,
            medium_tokens: 8_000,
            large_tokens: 20_000,
        }
    }
}

impl CompressionThresholds {
    fn for_tier(&self, tier: ModelTier) -> u64 {
        match tier {
            ModelTier::Small => self.small_tokens,
            ModelTier::Medium => self.medium_tokens,
            ModelTier::Large => self.large_tokens,
        }
    }
}

/// Coordinates the `MemoryStore`/`SessionStore` collaborators into the
/// hierarchical-retrieval and compression contract of §4.E. Behavior is
/// gated by the caller-supplied `memory_retrieval_enabled`/
/// `context_compress_enabled` flags so that replaying an older workflow
/// history reproduces the behavior it ran with — the gate decision itself
/// (which `FeatureVersion` a given workflow execution is pinned to) lives in
/// the engine, not here.
pub struct MemoryManager {
    memory_store: Arc<dyn MemoryStore>,
    session_store: Arc<dyn SessionStore>,
    limits: RetrievalLimits,
    compression: CompressionThresholds,
}

impl MemoryManager {
    pub fn new(memory_store: Arc<dyn MemoryStore>, session_store: Arc<dyn SessionStore>) -> Self {
        MemoryManager {
            memory_store,
            session_store,
            limits: RetrievalLimits::default(),
            compression: CompressionThresholds::default(),
        }
    }

    pub fn with_limits(mut self, limits: RetrievalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_compression_thresholds(mut self, thresholds: CompressionThresholds) -> Self {
        self.compression = thresholds;
        self
    }

    /// Up to `k_recent` most recent messages plus up to `k_semantic`
    /// semantically similar prior exchanges (similarity >= threshold).
    /// Falls back to the chronological-only path when the retrieval feature
    /// is disabled for this workflow's pinned version.
    pub async fn fetch_hierarchical(
        &self,
        session_id: &str,
        query: &str,
        filter: &MemoryQueryFilter,
        memory_retrieval_enabled: bool,
    ) -> ShannonResult<Vec<MemoryItem>> {
        if !memory_retrieval_enabled {
            return self.fetch_session(session_id, self.limits.k_recent).await;
        }

        let recent = self.fetch_session(session_id, self.limits.k_recent).await?;
        let semantic = self
            .memory_store
            .query(session_id, query, self.limits.k_semantic, filter)
            .await?;

        let recent_contents: std::collections::HashSet<String> =
            recent.iter().map(|item| item.content.clone()).collect();

        let mut out = recent;
        for item in semantic {
            if item.similarity < self.limits.similarity_threshold {
                continue;
            }
            if recent_contents.contains(item.content.as_str()) {
                if let Some(existing) = out.iter_mut().find(|r| r.content == item.content) {
                    existing.source = MemorySource::Both;
                    existing.similarity = existing.similarity.max(item.similarity);
                }
            } else {
                out.push(item);
            }
        }
        Ok(out)
    }

    /// Chronological fallback: the last `limit` messages of the session's
    /// history, tagged `Recent`.
    pub async fn fetch_session(&self, session_id: &str, limit: usize) -> ShannonResult<Vec<MemoryItem>> {
        let Some(session) = self.session_store.load(session_id).await? else {
            return Ok(Vec::new());
        };
        Ok(session
            .history
            .iter()
            .rev()
            .take(limit)
            .enumerate()
            .map(|(idx, msg)| MemoryItem {
                id: format!("recent-{session_id}-{idx}"),
                content: msg.content.clone(),
                source: MemorySource::Recent,
                similarity: 1.0,
                created_at: msg.created_at,
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect())
    }

    /// Whether the session's history has crossed the tier-scaled
    /// compression threshold.
    pub async fn check_compression_needed(
        &self,
        session_id: &str,
        model_tier: ModelTier,
        context_compress_enabled: bool,
    ) -> ShannonResult<bool> {
        if !context_compress_enabled {
            return Ok(false);
        }
        let Some(session) = self.session_store.load(session_id).await? else {
            return Ok(false);
        };
        Ok(session.token_estimate >= self.compression.for_tier(model_tier))
    }

    /// Summarizes the session's history via `executor` and stores the
    /// summary, replacing the compressed portion of `history` with it. The
    /// summary is re-injected as `history_summary` by callers, not inlined
    /// back into `history` here.
    pub async fn compress_and_store(
        &self,
        session_id: &str,
        executor: &dyn AgentExecutor,
        model_tier: ModelTier,
    ) -> ShannonResult<String> {
        let Some(mut session) = self.session_store.load(session_id).await? else {
            return Err(MemoryError::NotFound(session_id.to_string()).into());
        };

        let transcript = session
            .history
            .iter()
            .map(|m| format!("{}: {}", role_label(m.role), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let window_tokens = self.compression.for_tier(model_tier) / 2;
        let windows = windows(&transcript, window_tokens as usize).map_err(shannon_types::ShannonError::from)?;

        let mut summary_parts = Vec::with_capacity(windows.len());
        for window in windows {
            let prompt = format!(
                "Summarize the following conversation excerpt concisely, preserving facts and decisions:\n\n{}",
                window.content
            );
            let outcome = executor.execute(&prompt, None, model_tier, None).await?;
            summary_parts.push(outcome.text);
        }
        let summary = summary_parts.join("\n");

        self.update_compression_state(&mut session, &summary)?;
        self.session_store.save(&session).await?;
        Ok(summary)
    }

    /// Marks the session as compressed as of now, replacing its in-line
    /// history with the summary so future retrieval sees a bounded history.
    pub fn update_compression_state(&self, session: &mut Session, summary: &str) -> ShannonResult<()> {
        let tokenizer = Tokenizer::new().map_err(shannon_types::ShannonError::from)?;
        session.summary = Some(summary.to_string());
        session.compressed_at = Some(Utc::now());
        session.history = vec![HistoryMessage {
            role: MessageRole::System,
            content: format!("[compressed history summary]\n{summary}"),
            created_at: Utc::now(),
            token_estimate: tokenizer.count_tokens(summary) as u64,
        }];
        session.token_estimate = session.history.iter().map(|m| m.token_estimate).sum();
        Ok(())
    }
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
        MessageRole::Tool => "tool",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteMemoryStore;
    use crate::embedder::HashEmbedder;
    use async_trait::async_trait;
    use shannon_types::{AgentExecutionOutcome, ShannonResult as Result_};

    struct EchoExecutor;

    #[async_trait]
    impl AgentExecutor for EchoExecutor {
        async fn execute(
            &self,
            prompt: &str,
            _tools: Option<&[String]>,
            _model_tier: ModelTier,
            _max_tokens: Option<u32>,
        ) -> Result_<AgentExecutionOutcome> {
            Ok(AgentExecutionOutcome {
                text: format!("summary of: {}", &prompt[..prompt.len().min(20)]),
                input_tokens: 10,
                output_tokens: 5,
                model_used: "stub".into(),
                provider: "stub".into(),
                tool_calls: vec![],
            })
        }
    }

    fn manager() -> (MemoryManager, Arc<SqliteMemoryStore>) {
        let store = Arc::new(SqliteMemoryStore::open_in_memory(Arc::new(HashEmbedder::default())).unwrap());
        let manager = MemoryManager::new(store.clone(), store.clone());
        (manager, store)
    }

    #[tokio::test]
    async fn fetch_session_returns_chronological_tail() {
        let (manager, store) = manager();
        let mut session = Session::new("s1", "tenant", "user");
        for i in 0..10 {
            session.history.push(HistoryMessage {
                role: MessageRole::User,
                content: format!("message {i}"),
                created_at: Utc::now(),
                token_estimate: 2,
            });
        }
        store.save(&session).await.unwrap();

        let items = manager.fetch_session("s1", 3).await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.last().unwrap().content, "message 9");
    }

    #[tokio::test]
    async fn compression_threshold_respects_gate_flag() {
        let (manager, store) = manager();
        let mut session = Session::new("s1", "tenant", "user");
        session.token_estimate = 100_000;
        store.save(&session).await.unwrap();

        assert!(!manager
            .check_compression_needed("s1", ModelTier::Small, false)
            .await
            .unwrap());
        assert!(manager
            .check_compression_needed("s1", ModelTier::Small, true)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn compress_and_store_replaces_history_with_summary() {
        let (manager, store) = manager();
        let mut session = Session::new("s1", "tenant", "user");
        session.history.push(HistoryMessage {
            role: MessageRole::User,
            content: "a very long message ".repeat(50),
            created_at: Utc::now(),
            token_estimate: 200,
        });
        store.save(&session).await.unwrap();

        let executor = EchoExecutor;
        manager.compress_and_store("s1", &executor, ModelTier::Small).await.unwrap();

        let reloaded = store.load("s1").await.unwrap().unwrap();
        assert!(reloaded.compressed_at.is_some());
        assert_eq!(reloaded.history.len(), 1);
        assert_eq!(reloaded.history[0].role, MessageRole::System);
    }
}
