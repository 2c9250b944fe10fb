//! Retention sweeps over the conversation history.
//!
//! A sweep deletes every record older than the horizon in one statement. It
//! runs once at startup and whenever an operator asks for it; scheduling
//! repeated sweeps is left to whoever calls it.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use crate::adapters::sqlite::ConversationStore;
use crate::domain::errors::{StorageError, StorageResult};
use crate::domain::models::ScopeToken;

/// Default retention horizon.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

/// Longest accepted retention horizon, roughly a century.
pub const MAX_HORIZON_DAYS: u32 = 36_500;

#[derive(Clone)]
pub struct RetentionSweeper {
    store: ConversationStore,
    horizon_days: u32,
}

impl RetentionSweeper {
    pub const fn new(store: ConversationStore, horizon_days: u32) -> Self {
        Self {
            store,
            horizon_days,
        }
    }

    pub const fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Sweep with the configured horizon.
    pub async fn sweep_default(&self) -> StorageResult<u64> {
        self.sweep(self.horizon_days).await
    }

    /// Delete records older than `horizon_days` days. Returns how many went.
    ///
    /// Horizons above [`MAX_HORIZON_DAYS`] are rejected before touching storage.
    pub async fn sweep(&self, horizon_days: u32) -> StorageResult<u64> {
        let cutoff = cutoff_for(Utc::now(), horizon_days)?;
        self.sweep_before(cutoff).await
    }

    /// Delete records with a timestamp strictly before `cutoff`.
    pub async fn sweep_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let handle = self.store.pool().acquire(&ScopeToken::maintenance()).await?;
        let deleted = self.store.delete_older_than(&handle, cutoff).await?;

        if deleted > 0 {
            info!(deleted, cutoff = %cutoff, "cleaned up old conversations");
        }
        Ok(deleted)
    }
}

fn cutoff_for(now: DateTime<Utc>, horizon_days: u32) -> StorageResult<DateTime<Utc>> {
    if horizon_days > MAX_HORIZON_DAYS {
        return Err(StorageError::HorizonOutOfRange(horizon_days));
    }
    TimeDelta::try_days(i64::from(horizon_days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or(StorageError::HorizonOutOfRange(horizon_days))
}
