//! Ollama HTTP backend.
//!
//! Talks to `/api/generate` (non-streaming) for completions and `/api/tags`
//! for readiness and model listing.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::domain::errors::BackendError;
use crate::domain::models::{BackendConfig, Generation, ModelInfo};
use crate::domain::ports::LlmBackend;

/// Text used when Ollama answers without a `response` field.
const EMPTY_RESPONSE: &str = "No response generated";

/// Configuration for the Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub generate_timeout: Duration,
    pub health_timeout: Duration,
    pub models_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

impl From<&BackendConfig> for OllamaConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_url: config.host.trim_end_matches('/').to_string(),
            generate_timeout: config.generate_timeout(),
            health_timeout: config.health_timeout(),
            models_timeout: config.models_timeout(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_at: String,
}

impl From<TagModel> for ModelInfo {
    fn from(tag: TagModel) -> Self {
        Self {
            name: tag.name,
            size: tag.size,
            modified_at: tag.modified_at,
        }
    }
}

/// Ollama backend over HTTP.
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn fetch_tags(&self, timeout: Duration) -> Result<TagsResponse, BackendError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::from(err)
    }
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, prompt: &str, model: &str) -> Result<Generation, BackendError> {
        let timeout = self.config.generate_timeout;
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        debug!(model, prompt_chars = prompt.len(), "calling ollama generate");
        let result = async {
            let response = self
                .client
                .post(self.url("/api/generate"))
                .json(&request)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(e, timeout))?;
            let response = ensure_success(response).await?;
            let body: GenerateResponse = response.json().await?;
            Ok::<_, BackendError>(Generation {
                text: body.response.unwrap_or_else(|| EMPTY_RESPONSE.to_string()),
                model: body.model.unwrap_or_else(|| model.to_string()),
            })
        }
        .await;

        if let Err(e) = &result {
            error!(model, error = %e, "ollama generate failed");
        }
        result
    }

    async fn health_check(&self) -> bool {
        match self.fetch_tags(self.config.health_timeout).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "ollama health check failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        let tags = self.fetch_tags(self.config.models_timeout).await?;
        Ok(tags.models.into_iter().map(ModelInfo::from).collect())
    }
}
