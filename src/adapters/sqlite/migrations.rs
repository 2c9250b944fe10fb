//! Embedded schema migrations.

use sqlx::Connection;
use tracing::info;

use super::connection::PooledHandle;
use crate::domain::errors::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Applies pending migrations through a single pooled handle.
pub struct Migrator<'a> {
    handle: &'a PooledHandle,
}

impl<'a> Migrator<'a> {
    pub const fn new(handle: &'a PooledHandle) -> Self {
        Self { handle }
    }

    /// Apply every migration newer than the recorded schema version.
    ///
    /// Each migration runs in its own transaction together with its version
    /// row, so a failure leaves earlier migrations applied and the failed one
    /// absent. Returns how many were applied.
    pub async fn run_embedded_migrations(
        &self,
        migrations: Vec<Migration>,
    ) -> StorageResult<usize> {
        self.ensure_migrations_table().await?;
        let current_version = self.current_version().await?;
        let pending: Vec<_> = migrations
            .into_iter()
            .filter(|m| m.version > current_version)
            .collect();

        for migration in &pending {
            self.apply_migration(migration).await?;
            info!(
                version = migration.version,
                description = migration.description,
                "applied migration"
            );
        }

        Ok(pending.len())
    }

    async fn ensure_migrations_table(&self) -> StorageResult<()> {
        let mut conn = self.handle.lock().await;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                description TEXT
            )",
        )
        .execute(&mut *conn)
        .await
        .map_err(|source| StorageError::Migration { version: 0, source })?;
        Ok(())
    }

    pub async fn current_version(&self) -> StorageResult<i64> {
        let mut conn = self.handle.lock().await;
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&mut *conn)
                .await?;
        Ok(version)
    }

    async fn apply_migration(&self, migration: &Migration) -> StorageResult<()> {
        let to_migration_error = |source: sqlx::Error| StorageError::Migration {
            version: migration.version,
            source,
        };

        let mut conn = self.handle.lock().await;
        let mut tx = conn.begin().await.map_err(to_migration_error)?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(to_migration_error)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(to_migration_error)?;
        tx.commit().await.map_err(to_migration_error)?;
        Ok(())
    }
}

pub fn conversations_migration() -> Migration {
    Migration {
        version: 1,
        description: "Conversation history",
        sql: include_str!("../../../migrations/001_conversations.sql"),
    }
}

pub fn all_embedded_migrations() -> Vec<Migration> {
    vec![conversations_migration()]
}
