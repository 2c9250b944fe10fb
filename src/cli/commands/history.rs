use anyhow::{Context, Result};

use super::open_store;
use crate::cli::output::TableFormatter;
use crate::domain::models::{Config, ScopeToken};

/// Handle the history command
pub async fn execute(config: &Config, agent: &str, limit: u32, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let handle = store
        .pool()
        .acquire(&ScopeToken::for_agent(agent))
        .await
        .context("Failed to open storage handle")?;
    let records = store
        .query(&handle, agent, limit)
        .await
        .with_context(|| format!("Failed to load history for agent '{agent}'"))?;
    drop(handle);
    store.pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No conversations found for agent '{agent}'.");
        return Ok(());
    }

    println!("Conversations for {agent}:");
    println!("{}", TableFormatter::new().format_conversations(&records));
    println!(
        "\nShowing {} conversation{}",
        records.len(),
        if records.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
