use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::adapters::backends::{OllamaBackend, OllamaConfig};
use crate::adapters::http::{shutdown_signal, DispatchHttpServer};
use crate::domain::models::Config;
use crate::infrastructure::logging::LoggerImpl;
use crate::services::Dispatcher;

/// Handle the serve command
///
/// Startup order: logger, backend client, dispatcher (pool and store),
/// schema, backend probe, startup sweep, then the HTTP server until Ctrl-C.
pub async fn execute(config: Config) -> Result<()> {
    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;

    let backend = OllamaBackend::new(OllamaConfig::from(&config.backend))
        .context("Failed to build backend client")?;
    let dispatcher = Arc::new(
        Dispatcher::from_config(&config, Arc::new(backend))
            .context("Failed to prepare conversation storage")?,
    );

    let report = dispatcher
        .startup(config.retention.sweep_on_startup)
        .await
        .context("Failed to initialize conversation store")?;
    if report.swept > 0 {
        info!(deleted = report.swept, "cleaned up old conversations on startup");
    }

    let server = DispatchHttpServer::new(Arc::clone(&dispatcher), config);
    let served = server.serve_with_shutdown(shutdown_signal()).await;

    dispatcher.shutdown().await;
    info!("dispatcher stopped");

    served.map_err(|e| anyhow::anyhow!(e)).context("HTTP server failed")
}
