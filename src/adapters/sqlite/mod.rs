//! `SQLite` storage adapters: the scope-keyed connection pool, embedded
//! migrations and the conversation store.

pub mod connection;
pub mod conversation_store;
pub mod migrations;

pub use connection::{ConnectionPool, PooledHandle};
pub use conversation_store::ConversationStore;
pub use migrations::{all_embedded_migrations, Migration, Migrator};

use chrono::{DateTime, Utc};

use crate::domain::errors::StorageResult;

/// Parse an RFC3339 datetime string from a `SQLite` row field.
pub fn parse_datetime(s: &str) -> StorageResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
