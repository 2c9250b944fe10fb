//! Scripted backend for tests and offline runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::errors::BackendError;
use crate::domain::models::{Generation, ModelInfo};
use crate::domain::ports::LlmBackend;

/// Backend that answers every prompt with a fixed text.
///
/// Optionally sleeps before answering, or fails every call, and records the
/// prompts it received.
pub struct MockBackend {
    reply: String,
    model: Option<String>,
    delay: Option<Duration>,
    failure: Option<String>,
    healthy: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Answer every prompt with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            model: None,
            delay: None,
            failure: None,
            healthy: true,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail every generation with a request error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            healthy: false,
            ..Self::replying("")
        }
    }

    /// Sleep this long before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report this model name instead of echoing the requested one.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Number of `generate` calls received, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn generate(&self, prompt: &str, model: &str) -> Result<Generation, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(BackendError::Request(message.clone()));
        }

        Ok(Generation {
            text: self.reply.clone(),
            model: self.model.clone().unwrap_or_else(|| model.to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        Ok(vec![ModelInfo {
            name: self.model.clone().unwrap_or_else(|| "mock".to_string()),
            size: 0,
            modified_at: String::new(),
        }])
    }
}
