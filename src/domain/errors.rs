//! Domain errors for the dispatcher.

use std::time::Duration;
use thiserror::Error;

/// Failures talking to the language-model backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Backend request failed: {0}")]
    Request(String),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Failures of the durable conversation store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open storage handle: {0}")]
    HandleCreation(#[source] sqlx::Error),

    #[error("Failed to create storage directory: {0}")]
    DirectoryCreation(#[source] std::io::Error),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Failed to apply migration {version}: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Retention horizon of {0} days is out of range")]
    HorizonOutOfRange(u32),
}

/// Terminal failure of a single dispatch.
///
/// A cache miss is not an error and persistence failures after a successful
/// generation are absorbed, so only these two reach the caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

pub type StorageResult<T> = Result<T, StorageError>;
pub type DispatchResult<T> = Result<T, DispatchError>;
