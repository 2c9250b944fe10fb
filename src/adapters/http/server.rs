//! Dispatcher HTTP server.
//!
//! Exposes chat, history, model listing, health and maintenance endpoints,
//! plus an OpenAI-compatible completion route for editor integrations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::openai::{OpenAiCompletionRequest, OpenAiCompletionResponse, OpenAiModelList};
use crate::domain::errors::{DispatchError, StorageError};
use crate::domain::models::{
    ChatReply, ChatRequest, Config, ConversationRecord, ModelInfo, ScopeToken, ServerConfig,
};
use crate::services::{Dispatcher, PerformanceSnapshot};

/// Longest accepted chat input, in characters.
pub const MAX_INPUT_CHARS: usize = 10_000;

/// Configuration for the dispatcher HTTP server.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl From<&ServerConfig> for HttpConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            enable_cors: server.enable_cors,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

fn dispatch_error(err: &DispatchError) -> ApiError {
    match err {
        DispatchError::BackendUnavailable(e) => {
            api_error(StatusCode::BAD_GATEWAY, "BACKEND_UNAVAILABLE", e.to_string())
        }
        DispatchError::Storage(e) => storage_error(e),
    }
}

fn storage_error(err: &StorageError) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string())
}

/// Incoming `/chat` body.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub agent: String,
    pub input: String,
    #[serde(default)]
    pub context: Option<Value>,
}

impl ChatBody {
    /// Check field bounds and convert into a dispatcher request.
    pub fn validate(self) -> Result<ChatRequest, String> {
        if self.agent.trim().is_empty() {
            return Err("agent must not be empty".to_string());
        }
        let chars = self.input.chars().count();
        if chars == 0 || chars > MAX_INPUT_CHARS {
            return Err(format!(
                "input must be between 1 and {MAX_INPUT_CHARS} characters, got {chars}"
            ));
        }
        Ok(ChatRequest {
            agent: self.agent,
            input: self.input,
            context: self.context,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub ollama_status: String,
    pub memory_status: String,
}

const fn status_word(healthy: bool) -> &'static str {
    if healthy {
        "healthy"
    } else {
        "unhealthy"
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

const fn default_history_limit() -> u32 {
    10
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub conversations: Vec<ConversationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub cached_entries: usize,
    pub max_cache_size: usize,
    pub ttl_seconds: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseMetrics {
    pub active_handles: usize,
    pub max_handles: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PerformanceResponse {
    pub cache: CacheMetrics,
    pub database: DatabaseMetrics,
    pub database_size_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<PerformanceSnapshot> for PerformanceResponse {
    fn from(snapshot: PerformanceSnapshot) -> Self {
        Self {
            cache: CacheMetrics {
                cached_entries: snapshot.cache.entries,
                max_cache_size: snapshot.cache.max_entries,
                ttl_seconds: snapshot.cache.ttl_secs,
                hits: snapshot.cache.hits,
                misses: snapshot.cache.misses,
                hit_rate: snapshot.cache.hit_rate(),
            },
            database: DatabaseMetrics {
                active_handles: snapshot.database.active_handles,
                max_handles: snapshot.database.max_handles,
            },
            database_size_bytes: snapshot.database_size_bytes,
            timestamp: snapshot.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub status: String,
    pub deleted_conversations: u64,
    pub timestamp: DateTime<Utc>,
}

/// Shared state for the HTTP server.
struct AppState {
    dispatcher: Arc<Dispatcher>,
    config: Config,
}

/// Dispatcher HTTP server.
pub struct DispatchHttpServer {
    http: HttpConfig,
    state: Arc<AppState>,
}

impl DispatchHttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, config: Config) -> Self {
        Self {
            http: HttpConfig::from(&config.server),
            state: Arc::new(AppState { dispatcher, config }),
        }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let app = Router::new()
            .route("/health", get(health_check))
            .route("/models", get(list_models))
            .route("/chat", post(chat))
            .route("/conversations/{agent}", get(conversations))
            .route("/agents/configure", post(configure_agent))
            .route("/v1/chat/completions", post(openai_chat_completions))
            .route("/v1/models", get(openai_models))
            .route("/performance", get(performance))
            .route("/cleanup", post(cleanup))
            .with_state(Arc::clone(&self.state));

        if self.http.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.http.host, self.http.port).parse()?;
        let router = self.router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "dispatch HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Resolves when the process receives Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

// Handler functions

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let report = state.dispatcher.health().await;
    Json(HealthResponse {
        status: status_word(report.is_healthy()).to_string(),
        timestamp: Utc::now(),
        ollama_status: status_word(report.backend_healthy).to_string(),
        memory_status: status_word(report.storage_healthy).to_string(),
    })
}

async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<ModelsResponse>, ApiError> {
    state
        .dispatcher
        .models()
        .await
        .map(|models| Json(ModelsResponse { models }))
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list models");
            api_error(StatusCode::BAD_GATEWAY, "BACKEND_UNAVAILABLE", e.to_string())
        })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let request = body
        .validate()
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e))?;
    let scope = ScopeToken::for_agent(&request.agent);

    state
        .dispatcher
        .dispatch(&scope, request)
        .await
        .map(Json)
        .map_err(|e| dispatch_error(&e))
}

async fn conversations(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let scope = ScopeToken::for_agent(&agent);
    state
        .dispatcher
        .history(&scope, &agent, params.limit)
        .await
        .map(|conversations| Json(HistoryResponse { conversations }))
        .map_err(|e| storage_error(&e))
}

async fn configure_agent(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "agent": config.persona,
        "infrastructure": {
            "backend": config.backend,
            "storage": config.storage,
            "cache": config.cache,
            "retention": config.retention,
        },
        "status": "configured",
    }))
}

async fn openai_chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenAiCompletionRequest>,
) -> Result<Json<OpenAiCompletionResponse>, ApiError> {
    let agent = state.dispatcher.settings().default_agent.clone();
    let chat = request
        .to_chat_request(&agent)
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "NO_USER_MESSAGE",
                "No user message found",
            )
        })?;
    let input = chat.input.clone();
    let scope = ScopeToken::for_agent(&agent);

    let reply = state
        .dispatcher
        .dispatch(&scope, chat)
        .await
        .map_err(|e| dispatch_error(&e))?;

    Ok(Json(OpenAiCompletionResponse::from_reply(
        reply,
        &input,
        &request.model,
    )))
}

async fn openai_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OpenAiModelList>, ApiError> {
    state
        .dispatcher
        .models()
        .await
        .map(|models| Json(OpenAiModelList::from_models(models)))
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list models");
            api_error(StatusCode::BAD_GATEWAY, "BACKEND_UNAVAILABLE", e.to_string())
        })
}

async fn performance(State(state): State<Arc<AppState>>) -> Json<PerformanceResponse> {
    Json(state.dispatcher.metrics().await.into())
}

async fn cleanup(State(state): State<Arc<AppState>>) -> Result<Json<CleanupResponse>, ApiError> {
    let deleted = state.dispatcher.cleanup().await.map_err(|e| {
        tracing::error!(error = %e, "cleanup failed");
        storage_error(&e)
    })?;

    Ok(Json(CleanupResponse {
        status: "success".to_string(),
        deleted_conversations: deleted,
        timestamp: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::BackendError;

    fn body(agent: &str, input: &str) -> ChatBody {
        ChatBody {
            agent: agent.to_string(),
            input: input.to_string(),
            context: None,
        }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(body("a", "x").validate().is_ok());
        assert!(body("a", &"x".repeat(MAX_INPUT_CHARS)).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(body("", "hello").validate().is_err());
        assert!(body("   ", "hello").validate().is_err());
        assert!(body("a", "").validate().is_err());
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        // 10,000 multi-byte characters are still within bounds.
        let input = "é".repeat(MAX_INPUT_CHARS);
        assert!(body("a", &input).validate().is_ok());
        assert!(body("a", &"x".repeat(MAX_INPUT_CHARS + 1)).validate().is_err());
    }

    #[test]
    fn test_dispatch_error_status_codes() {
        let backend = DispatchError::BackendUnavailable(BackendError::Request("refused".into()));
        assert_eq!(dispatch_error(&backend).0, StatusCode::BAD_GATEWAY);

        let storage = DispatchError::Storage(StorageError::DirectoryCreation(
            std::io::Error::other("denied"),
        ));
        assert_eq!(dispatch_error(&storage).0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
