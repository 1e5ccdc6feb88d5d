use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use shannon_types::{
    HistoryMessage, MemoryItem, MemoryQueryFilter, MemorySource, MemoryStore, Session, SessionStore,
    ShannonError, ShannonResult,
};
use tokio::sync::Mutex;

use crate::embedder::{cosine_similarity, Embedder};
use crate::error::MemoryError;

/// Reference `MemoryStore`/`SessionStore` implementation backed by SQLite,
/// suitable for tests and single-node deployments (§4.E). Similarity search
/// is a linear scan in Rust over stored embeddings rather than a vector
/// index extension — acceptable at reference scale, and it keeps this store
/// free of a native extension-loading dependency. A production deployment
/// swapping in a real vector index only needs to implement the same
/// `MemoryStore` trait.
pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
}

struct StoredItem {
    id: String,
    content: String,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
}

impl SqliteMemoryStore {
    pub fn open(path: &Path, embedder: Arc<dyn Embedder>) -> ShannonResult<Self> {
        let conn = Connection::open(path).map_err(MemoryError::Database)?;
        Self::init_schema(&conn)?;
        Ok(SqliteMemoryStore {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> ShannonResult<Self> {
        let conn = Connection::open_in_memory().map_err(MemoryError::Database)?;
        Self::init_schema(&conn)?;
        Ok(SqliteMemoryStore {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn init_schema(conn: &Connection) -> ShannonResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                history TEXT NOT NULL,
                summary TEXT,
                token_estimate INTEGER NOT NULL,
                compressed_at TEXT
            );
            CREATE TABLE IF NOT EXISTS memory_items (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                tenant_id TEXT,
                project_id TEXT,
                content TEXT NOT NULL,
                embedding TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memory_items_session ON memory_items(session_id);",
        )
        .map_err(MemoryError::Database)?;
        Ok(())
    }

    fn candidates(conn: &Connection, filter: &MemoryQueryFilter) -> ShannonResult<Vec<StoredItem>> {
        let mut sql = String::from("SELECT id, content, embedding, created_at FROM memory_items WHERE 1=1");
        let mut bind: Vec<String> = Vec::new();
        if let Some(tenant_id) = &filter.tenant_id {
            sql.push_str(" AND tenant_id = ?");
            bind.push(tenant_id.clone());
        }
        if let Some(project_id) = &filter.project_id {
            sql.push_str(" AND project_id = ?");
            bind.push(project_id.clone());
        }

        let mut stmt = conn.prepare(&sql).map_err(MemoryError::Database)?;
        let bound: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(bound.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(MemoryError::Database)?;

        let mut items = Vec::new();
        for row in rows {
            let (id, content, embedding_json, created_at) = row.map_err(MemoryError::Database)?;
            let embedding: Vec<f32> = serde_json::from_str(&embedding_json).map_err(MemoryError::Serialization)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            items.push(StoredItem {
                id,
                content,
                embedding,
                created_at,
            });
        }
        Ok(items)
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn query(
        &self,
        _session_id: &str,
        query: &str,
        k: usize,
        filter: &MemoryQueryFilter,
    ) -> ShannonResult<Vec<MemoryItem>> {
        let query_embedding = self.embedder.embed(query).await.map_err(Into::<ShannonError>::into)?;
        let conn = self.conn.lock().await;
        let candidates = Self::candidates(&conn, filter)?;
        drop(conn);

        let mut scored: Vec<(f32, StoredItem)> = candidates
            .into_iter()
            .map(|item| (cosine_similarity(&query_embedding, &item.embedding), item))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(similarity, item)| MemoryItem {
                id: item.id,
                content: item.content,
                source: MemorySource::Semantic,
                similarity,
                created_at: item.created_at,
            })
            .collect())
    }

    async fn upsert(&self, session_id: &str, items: Vec<MemoryItem>) -> ShannonResult<()> {
        let conn = self.conn.lock().await;
        let tenant_id: Option<String> = conn
            .query_row(
                "SELECT tenant_id FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(MemoryError::Database)?;

        for item in items {
            let embedding = self
                .embedder
                .embed(&item.content)
                .await
                .map_err(Into::<ShannonError>::into)?;
            let embedding_json = serde_json::to_string(&embedding).map_err(MemoryError::Serialization)?;
            conn.execute(
                "INSERT INTO memory_items (id, session_id, tenant_id, project_id, content, embedding, created_at)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET content = excluded.content, embedding = excluded.embedding",
                params![
                    item.id,
                    session_id,
                    tenant_id,
                    item.content,
                    embedding_json,
                    item.created_at.to_rfc3339(),
                ],
            )
            .map_err(MemoryError::Database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteMemoryStore {
    async fn load(&self, session_id: &str) -> ShannonResult<Option<Session>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT tenant_id, user_id, history, summary, token_estimate, compressed_at
                 FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(MemoryError::Database)?;

        let Some((tenant_id, user_id, history_json, summary, token_estimate, compressed_at)) = row else {
            return Ok(None);
        };
        let history: Vec<HistoryMessage> =
            serde_json::from_str(&history_json).map_err(MemoryError::Serialization)?;
        let compressed_at =
            compressed_at.and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok().map(|dt| dt.with_timezone(&Utc)));

        Ok(Some(Session {
            session_id: session_id.to_string(),
            tenant_id,
            user_id,
            history,
            summary,
            token_estimate: token_estimate as u64,
            compressed_at,
        }))
    }

    async fn save(&self, session: &Session) -> ShannonResult<()> {
        let history_json = serde_json::to_string(&session.history).map_err(MemoryError::Serialization)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sessions (session_id, tenant_id, user_id, history, summary, token_estimate, compressed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(session_id) DO UPDATE SET
                tenant_id = excluded.tenant_id,
                user_id = excluded.user_id,
                history = excluded.history,
                summary = excluded.summary,
                token_estimate = excluded.token_estimate,
                compressed_at = excluded.compressed_at",
            params![
                session.session_id,
                session.tenant_id,
                session.user_id,
                history_json,
                session.summary,
                session.token_estimate as i64,
                session.compressed_at.map(|dt| dt.to_rfc3339()),
            ],
        )
        .map_err(MemoryError::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use shannon_types::MessageRole as Role;

    fn store() -> SqliteMemoryStore {
        SqliteMemoryStore::open_in_memory(Arc::new(HashEmbedder::default())).unwrap()
    }

    #[tokio::test]
    async fn session_round_trips() {
        let store = store();
        let mut session = Session::new("sess-1", "tenant-a", "user-1");
        session.history.push(HistoryMessage {
            role: Role::User,
            content: "hello".into(),
            created_at: Utc::now(),
            token_estimate: 2,
        });
        store.save(&session).await.unwrap();

        let loaded = store.load("sess-1").await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.tenant_id, "tenant-a");
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let store = store();
        let session = Session::new("sess-1", "tenant-a", "user-1");
        store.save(&session).await.unwrap();

        store
            .upsert(
                "sess-1",
                vec![
                    MemoryItem {
                        id: "m1".into(),
                        content: "the quick brown fox".into(),
                        source: MemorySource::Semantic,
                        similarity: 0.0,
                        created_at: Utc::now(),
                    },
                    MemoryItem {
                        id: "m2".into(),
                        content: "completely unrelated text".into(),
                        source: MemorySource::Semantic,
                        similarity: 0.0,
                        created_at: Utc::now(),
                    },
                ],
            )
            .await
            .unwrap();

        let results = store
            .query("sess-1", "the quick brown fox", 1, &MemoryQueryFilter::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m1");
    }
}
