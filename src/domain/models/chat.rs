//! Request and reply types flowing through the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated chat request handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Agent identifier the exchange is recorded under.
    pub agent: String,
    /// Raw user input.
    pub input: String,
    /// Optional structured context, folded into the prompt and persisted.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

impl ChatRequest {
    /// Create a request without context.
    pub fn new(agent: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            input: input.into(),
            context: None,
        }
    }

    /// Attach a context blob.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// The user-level prompt: the input alone, or the input prefixed with the
    /// pretty-printed context. This is what the cache key is derived from.
    pub fn prompt(&self) -> String {
        match &self.context {
            Some(context) => {
                let rendered = serde_json::to_string_pretty(context)
                    .unwrap_or_else(|_| context.to_string());
                format!("Context: {rendered}\n\nUser Input: {}", self.input)
            }
            None => self.input.clone(),
        }
    }
}

/// What the backend produced for a prompt. This is also the cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub model: String,
}

/// Reply returned to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub id: String,
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub success: bool,
    /// Whether the text came from the response cache.
    #[serde(default)]
    pub cached: bool,
}

/// A model advertised by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
    pub modified_at: String,
}
