//! Chat dispatch: cache lookup, backend call, write-through and persistence.
//!
//! ```text
//! RECEIVED -> CACHE_CHECK -> CACHE_HIT -> RESPOND
//!                         -> CACHE_MISS -> ACQUIRE_HANDLE -> EXTERNAL_CALL
//!                               -> SUCCESS -> CACHE_WRITE -> PERSIST -> RESPOND
//!                               -> FAILURE -> ERROR_RESPOND
//! ```
//!
//! The cache lock is never held across the backend call. A cache hit writes
//! no conversation row, so repeated identical prompts do not duplicate
//! history. A failed append after a successful generation is logged and the
//! reply still goes out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::cache::{CacheStats, ResponseCache};
use crate::adapters::sqlite::{ConnectionPool, ConversationStore};
use crate::domain::errors::{BackendError, DispatchResult, StorageResult};
use crate::domain::models::{
    conversation_id, ChatReply, ChatRequest, Config, ConversationRecord, Generation, ModelInfo,
    ScopeToken,
};
use crate::domain::ports::LlmBackend;
use crate::services::retention_sweeper::RetentionSweeper;
use crate::services::system_prompt::{render_full_prompt, render_system_prompt};

/// Per-process dispatch settings.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Model every generation is requested from.
    pub model: String,
    /// Reply author; cached replies get a ` (Cached)` suffix.
    pub author: String,
    /// Agent for callers that do not name one.
    pub default_agent: String,
    /// Bound on a single backend call.
    pub generate_timeout: Duration,
    /// Rendered system prompt prepended to every generation.
    pub system_prompt: String,
}

impl DispatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.backend.model.clone(),
            author: config.persona.name.clone(),
            default_agent: config.persona.default_agent.clone(),
            generate_timeout: config.backend.generate_timeout(),
            system_prompt: render_system_prompt(&config.persona),
        }
    }
}

/// Handle counts for the performance endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub active_handles: usize,
    pub max_handles: usize,
}

/// Snapshot served by the performance endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSnapshot {
    pub cache: CacheStats,
    pub database: DatabaseStats,
    pub database_size_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

/// Readiness of the two external dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub backend_healthy: bool,
    pub storage_healthy: bool,
}

impl HealthReport {
    pub const fn is_healthy(&self) -> bool {
        self.backend_healthy && self.storage_healthy
    }
}

/// What the startup sequence did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    pub migrations_applied: usize,
    pub backend_healthy: bool,
    pub swept: u64,
}

/// Orchestrates the cache, the backend and the conversation store.
pub struct Dispatcher {
    backend: Arc<dyn LlmBackend>,
    cache: Arc<ResponseCache>,
    store: ConversationStore,
    sweeper: RetentionSweeper,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        cache: Arc<ResponseCache>,
        store: ConversationStore,
        sweeper: RetentionSweeper,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            backend,
            cache,
            store,
            sweeper,
            settings,
        }
    }

    /// Wire every component from configuration. Opens no connection yet.
    pub fn from_config(config: &Config, backend: Arc<dyn LlmBackend>) -> StorageResult<Self> {
        let pool = Arc::new(ConnectionPool::open(
            &config.storage.path,
            config.storage.max_handles,
        )?);
        let store = ConversationStore::new(pool);
        let sweeper = RetentionSweeper::new(store.clone(), config.retention.horizon_days);
        let cache = Arc::new(ResponseCache::new(
            config.cache.ttl(),
            config.cache.max_entries,
        ));

        Ok(Self::new(
            backend,
            cache,
            store,
            sweeper,
            DispatcherSettings::from_config(config),
        ))
    }

    /// Ensure the schema, probe the backend and optionally sweep old records.
    ///
    /// Only a schema failure is fatal. An unreachable backend or a failed
    /// sweep is logged and startup continues.
    pub async fn startup(&self, sweep: bool) -> StorageResult<StartupReport> {
        let migrations_applied = self.store.initialize().await?;
        info!(
            path = %self.store.pool().path().display(),
            migrations_applied,
            "conversation store initialized"
        );

        let backend_healthy = self.backend.health_check().await;
        if backend_healthy {
            info!("backend is healthy");
        } else {
            warn!("backend is not responding");
        }

        let swept = if sweep {
            match self.sweeper.sweep_default().await {
                Ok(count) => count,
                Err(e) => {
                    error!(error = %e, "startup retention sweep failed");
                    0
                }
            }
        } else {
            0
        };

        info!(
            max_entries = self.cache.max_entries(),
            ttl_secs = self.cache.ttl().as_secs(),
            max_handles = self.store.pool().max_handles(),
            retention_days = self.sweeper.horizon_days(),
            "dispatcher ready"
        );

        Ok(StartupReport {
            migrations_applied,
            backend_healthy,
            swept,
        })
    }

    /// Run one chat request to completion.
    #[instrument(skip_all, fields(agent = %request.agent, scope = %scope))]
    pub async fn dispatch(
        &self,
        scope: &ScopeToken,
        request: ChatRequest,
    ) -> DispatchResult<ChatReply> {
        let prompt = request.prompt();
        let key = ResponseCache::key(&prompt, &self.settings.model);

        if let Some(cached) = self.cache.get(&key) {
            let id = conversation_id("conv", Utc::now());
            info!(id = %id, key = %key.short(), "returning cached response");
            return Ok(self.reply(id, cached, true, Utc::now()));
        }

        let handle = self.store.pool().acquire(scope).await?;

        let full_prompt = render_full_prompt(&self.settings.system_prompt, &prompt);
        let started = Instant::now();
        let generation = self.generate(&full_prompt).await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.cache.put(key, generation.clone());

        let record = ConversationRecord::new(
            request.agent,
            request.input,
            generation.text.clone(),
            generation.model.clone(),
            request.context,
        );
        if self.store.append(&handle, &record).await.is_err() {
            debug!(id = %record.id, "continuing without persisting conversation");
        }

        info!(id = %record.id, elapsed_ms, "response generated");
        Ok(self.reply(record.id, generation, false, record.timestamp))
    }

    async fn generate(&self, full_prompt: &str) -> Result<Generation, BackendError> {
        let limit = self.settings.generate_timeout;
        match timeout(limit, self.backend.generate(full_prompt, &self.settings.model)).await {
            Ok(Ok(generation)) => Ok(generation),
            Ok(Err(e)) => {
                error!(error = %e, "backend call failed");
                Err(e)
            }
            Err(_) => {
                error!(timeout_secs = limit.as_secs_f64(), "backend call timed out");
                Err(BackendError::Timeout(limit))
            }
        }
    }

    fn reply(
        &self,
        id: String,
        generation: Generation,
        cached: bool,
        timestamp: DateTime<Utc>,
    ) -> ChatReply {
        let author = if cached {
            format!("{} (Cached)", self.settings.author)
        } else {
            self.settings.author.clone()
        };
        ChatReply {
            id,
            author,
            text: generation.text,
            timestamp,
            model: generation.model,
            success: true,
            cached,
        }
    }

    /// Most recent conversations for an agent, newest first.
    pub async fn history(
        &self,
        scope: &ScopeToken,
        agent: &str,
        limit: u32,
    ) -> StorageResult<Vec<ConversationRecord>> {
        let handle = self.store.pool().acquire(scope).await?;
        self.store.query(&handle, agent, limit).await
    }

    /// Run a retention sweep with the configured horizon.
    pub async fn cleanup(&self) -> StorageResult<u64> {
        self.sweeper.sweep_default().await
    }

    pub async fn metrics(&self) -> PerformanceSnapshot {
        let pool = self.store.pool();
        PerformanceSnapshot {
            cache: self.cache.stats(),
            database: DatabaseStats {
                active_handles: pool.active_handles().await,
                max_handles: pool.max_handles(),
            },
            database_size_bytes: pool.storage_size_bytes(),
            timestamp: Utc::now(),
        }
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            backend_healthy: self.backend.health_check().await,
            storage_healthy: self.store.pool().storage_exists(),
        }
    }

    pub async fn models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        self.backend.list_models().await
    }

    /// Close every storage handle.
    pub async fn shutdown(&self) {
        self.store.pool().close().await;
    }

    pub const fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub const fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub const fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }
}
