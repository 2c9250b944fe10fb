use anyhow::{Context, Result};
use serde_json::json;

use super::open_store;
use crate::domain::models::Config;
use crate::services::{RetentionSweeper, MAX_HORIZON_DAYS};

/// Handle the cleanup command
pub async fn execute(config: &Config, days: Option<u32>, json: bool) -> Result<()> {
    let horizon_days = days.unwrap_or(config.retention.horizon_days);
    if horizon_days == 0 {
        anyhow::bail!("Retention horizon must be at least 1 day");
    }
    if horizon_days > MAX_HORIZON_DAYS {
        anyhow::bail!("Retention horizon must be at most {MAX_HORIZON_DAYS} days");
    }

    let store = open_store(config).await?;
    let sweeper = RetentionSweeper::new(store.clone(), horizon_days);
    let deleted = sweeper
        .sweep(horizon_days)
        .await
        .context("Failed to delete old conversations")?;
    store.pool().close().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "deleted_conversations": deleted,
                "horizon_days": horizon_days,
            }))?
        );
    } else {
        println!(
            "Deleted {deleted} conversation{} older than {horizon_days} days.",
            if deleted == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
