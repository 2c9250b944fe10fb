//! `SQLite` conversation history.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::connection::{ConnectionPool, PooledHandle};
use super::migrations::{all_embedded_migrations, Migrator};
use super::parse_datetime;
use crate::domain::errors::{StorageError, StorageResult};
use crate::domain::models::{timestamp_key, ConversationRecord, ScopeToken};

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    agent: String,
    user_input: String,
    ai_response: String,
    timestamp: String,
    model: String,
    context: Option<String>,
}

impl TryFrom<ConversationRow> for ConversationRecord {
    type Error = StorageError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        let context = row
            .context
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;

        Ok(Self {
            id: row.id,
            agent: row.agent,
            user_input: row.user_input,
            ai_response: row.ai_response,
            timestamp: parse_datetime(&row.timestamp)?,
            model: row.model,
            context,
        })
    }
}

/// Append-only store of conversation records.
///
/// All statements run through a caller-supplied [`PooledHandle`]; the store
/// adds no locking of its own beyond the handle's mutex.
#[derive(Clone)]
pub struct ConversationStore {
    pool: Arc<ConnectionPool>,
}

impl ConversationStore {
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Ensure the schema exists. Idempotent; returns the number of
    /// migrations applied by this call.
    pub async fn initialize(&self) -> StorageResult<usize> {
        let handle = self.pool.acquire(&ScopeToken::maintenance()).await?;
        Migrator::new(&handle)
            .run_embedded_migrations(all_embedded_migrations())
            .await
    }

    /// Write one record. Failures are logged here and returned to the caller.
    pub async fn append(
        &self,
        handle: &PooledHandle,
        record: &ConversationRecord,
    ) -> StorageResult<()> {
        let result = self.insert(handle, record).await;
        match &result {
            Ok(()) => debug!(id = %record.id, agent = %record.agent, "conversation saved"),
            Err(e) => warn!(
                id = %record.id,
                agent = %record.agent,
                error = %e,
                "failed to save conversation"
            ),
        }
        result
    }

    async fn insert(
        &self,
        handle: &PooledHandle,
        record: &ConversationRecord,
    ) -> StorageResult<()> {
        let context_json = record
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = handle.lock().await;
        sqlx::query(
            r"INSERT INTO conversations (id, agent, user_input, ai_response, timestamp, model, context)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.agent)
        .bind(&record.user_input)
        .bind(&record.ai_response)
        .bind(record.timestamp_key())
        .bind(&record.model)
        .bind(context_json)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// The `limit` most recent records for `agent`, newest first.
    pub async fn query(
        &self,
        handle: &PooledHandle,
        agent: &str,
        limit: u32,
    ) -> StorageResult<Vec<ConversationRecord>> {
        let mut conn = handle.lock().await;
        let rows: Vec<ConversationRow> = sqlx::query_as(
            r"SELECT id, agent, user_input, ai_response, timestamp, model, context
              FROM conversations
              WHERE agent = ?
              ORDER BY timestamp DESC
              LIMIT ?",
        )
        .bind(agent)
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await?;
        drop(conn);

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Delete every record strictly older than `cutoff` in one statement.
    pub async fn delete_older_than(
        &self,
        handle: &PooledHandle,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let mut conn = handle.lock().await;
        let result = sqlx::query("DELETE FROM conversations WHERE timestamp < ?")
            .bind(timestamp_key(cutoff))
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of stored records, optionally for one agent.
    pub async fn count(&self, handle: &PooledHandle, agent: Option<&str>) -> StorageResult<u64> {
        let mut conn = handle.lock().await;
        let (count,): (i64,) = match agent {
            Some(agent) => {
                sqlx::query_as("SELECT COUNT(*) FROM conversations WHERE agent = ?")
                    .bind(agent)
                    .fetch_one(&mut *conn)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM conversations")
                    .fetch_one(&mut *conn)
                    .await?
            }
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    async fn setup() -> (tempfile::TempDir, ConversationStore, PooledHandle) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let pool = ConnectionPool::open(dir.path().join("memory.sqlite"), 4).unwrap();
        let store = ConversationStore::new(Arc::new(pool));
        store.initialize().await.expect("failed to initialize");
        let handle = store
            .pool()
            .acquire(&ScopeToken::for_agent("hello_zombie"))
            .await
            .unwrap();
        (dir, store, handle)
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (_dir, store, _handle) = setup().await;
        assert_eq!(store.initialize().await.unwrap(), 0);
        assert_eq!(store.initialize().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_and_query_round_trip() {
        let (_dir, store, handle) = setup().await;
        let record = ConversationRecord::new(
            "hello_zombie",
            "What is 2+2?",
            "4",
            "gemma:2b",
            Some(json!({"test": true})),
        );
        store.append(&handle, &record).await.expect("append failed");

        let history = store.query(&handle, "hello_zombie", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, record.id);
        assert_eq!(history[0].context, Some(json!({"test": true})));
        // Stored at microsecond precision.
        assert_eq!(history[0].timestamp_key(), record.timestamp_key());
    }

    #[tokio::test]
    async fn test_query_orders_newest_first_and_limits() {
        let (_dir, store, handle) = setup().await;
        let now = Utc::now();
        for minutes in [30, 10, 20, 40] {
            let record = ConversationRecord::new("a", format!("q{minutes}"), "r", "m", None)
                .with_timestamp(now - Duration::minutes(minutes));
            store.append(&handle, &record).await.unwrap();
        }

        let history = store.query(&handle, "a", 3).await.unwrap();
        let inputs: Vec<_> = history.iter().map(|r| r.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["q10", "q20", "q30"]);
    }

    #[tokio::test]
    async fn test_query_filters_by_agent() {
        let (_dir, store, handle) = setup().await;
        store
            .append(&handle, &ConversationRecord::new("a", "x", "y", "m", None))
            .await
            .unwrap();
        store
            .append(&handle, &ConversationRecord::new("b", "x", "y", "m", None))
            .await
            .unwrap();

        assert_eq!(store.query(&handle, "a", 10).await.unwrap().len(), 1);
        assert_eq!(store.count(&handle, None).await.unwrap(), 2);
        assert_eq!(store.count(&handle, Some("b")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_unknown_agent_is_empty() {
        let (_dir, store, handle) = setup().await;
        let history = store.query(&handle, "nobody", 10).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_reported() {
        let (_dir, store, handle) = setup().await;
        let record = ConversationRecord::new("a", "x", "y", "m", None);
        store.append(&handle, &record).await.unwrap();

        let err = store.append(&handle, &record).await.unwrap_err();
        assert!(matches!(err, StorageError::Query(_)));
    }
}
