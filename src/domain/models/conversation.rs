//! Durable conversation records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed exchange between a user and the model.
///
/// Records are immutable once written. The store is the only writer; readers
/// always get owned copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub agent: String,
    pub user_input: String,
    pub ai_response: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl ConversationRecord {
    /// Create a record stamped with the current time and a fresh id.
    pub fn new(
        agent: impl Into<String>,
        user_input: impl Into<String>,
        ai_response: impl Into<String>,
        model: impl Into<String>,
        context: Option<serde_json::Value>,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            id: conversation_id("conv", timestamp),
            agent: agent.into(),
            user_input: user_input.into(),
            ai_response: ai_response.into(),
            timestamp,
            model: model.into(),
            context,
        }
    }

    /// Override the timestamp, used when importing or backdating records.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Storage form of the timestamp.
    pub fn timestamp_key(&self) -> String {
        timestamp_key(self.timestamp)
    }
}

/// Build a sortable, unique conversation id such as
/// `conv_20261016_093000_1f2e3d4c`.
pub fn conversation_id(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", at.format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Fixed-width RFC 3339 rendering. Lexicographic order of these strings is
/// chronological order, which the retention sweep and history queries rely on.
pub fn timestamp_key(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
