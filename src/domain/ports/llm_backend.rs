//! Port for the language-model backend.

use async_trait::async_trait;

use crate::domain::errors::BackendError;
use crate::domain::models::{Generation, ModelInfo};

/// A remote text-generation service.
///
/// The dispatcher bounds `generate` with its own timeout, so implementations
/// may also enforce one but callers never rely on it.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` for concurrent use across tokio tasks.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a completion for a fully rendered prompt.
    async fn generate(&self, prompt: &str, model: &str) -> Result<Generation, BackendError>;

    /// Readiness probe. Never errors; an unreachable backend is `false`.
    async fn health_check(&self) -> bool;

    /// Models the backend can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError>;
}
