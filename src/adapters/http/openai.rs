//! OpenAI-compatible request and response shapes.
//!
//! Only the subset editor integrations send is modelled. Sampling parameters
//! are accepted and ignored; the backend always runs the configured model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::models::{ChatReply, ChatRequest, ModelInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiCompletionRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: Option<bool>,
}

impl OpenAiCompletionRequest {
    /// Content of the last `user` message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }

    /// The dispatcher request for this completion, recorded under `agent`.
    ///
    /// Returns `None` when there is no user message to answer.
    pub fn to_chat_request(&self, agent: &str) -> Option<ChatRequest> {
        let input = self.last_user_message()?;
        Some(ChatRequest::new(agent, input).with_context(json!({
            "source": "openai_api",
            "model_requested": self.model,
        })))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChoice {
    pub index: u32,
    pub message: OpenAiMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl OpenAiUsage {
    /// Rough estimate at 1.3 tokens per whitespace-separated word.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let words = |text: &str| text.split_whitespace().count() as f64 * 1.3;
        let prompt_tokens = words(prompt);
        let completion_tokens = words(completion);
        Self {
            prompt_tokens: prompt_tokens as u64,
            completion_tokens: completion_tokens as u64,
            total_tokens: (prompt_tokens + completion_tokens) as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<OpenAiChoice>,
    pub usage: OpenAiUsage,
}

impl OpenAiCompletionResponse {
    /// Wrap a dispatcher reply. `model` echoes what the client asked for.
    pub fn from_reply(reply: ChatReply, prompt: &str, model: &str) -> Self {
        let usage = OpenAiUsage::estimate(prompt, &reply.text);
        Self {
            id: reply.id,
            object: "chat.completion".to_string(),
            created: reply.timestamp.timestamp(),
            model: model.to_string(),
            choices: vec![OpenAiChoice {
                index: 0,
                message: OpenAiMessage {
                    role: "assistant".to_string(),
                    content: reply.text,
                },
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiModel {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiModelList {
    pub object: String,
    pub data: Vec<OpenAiModel>,
}

impl OpenAiModelList {
    pub fn from_models(models: Vec<ModelInfo>) -> Self {
        let created = Utc::now().timestamp();
        Self {
            object: "list".to_string(),
            data: models
                .into_iter()
                .map(|m| OpenAiModel {
                    id: m.name,
                    object: "model".to_string(),
                    created,
                    owned_by: "hello-zombie".to_string(),
                })
                .collect(),
        }
    }
}
