//! CLI command implementations.

pub mod cleanup;
pub mod config;
pub mod history;
pub mod serve;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::sqlite::{ConnectionPool, ConversationStore};
use crate::domain::models::Config;

/// Open the configured database and make sure its schema is current.
pub(crate) async fn open_store(config: &Config) -> Result<ConversationStore> {
    let pool = ConnectionPool::open(&config.storage.path, config.storage.max_handles)
        .with_context(|| format!("Failed to open database at {}", config.storage.path.display()))?;
    let store = ConversationStore::new(Arc::new(pool));
    store
        .initialize()
        .await
        .context("Failed to initialize conversation store")?;
    Ok(store)
}
