//! Zombie Dispatch - chat dispatcher for a local language model
//!
//! Routes chat requests to an Ollama backend, answers repeated prompts from an
//! in-memory response cache, and keeps a durable per-agent conversation
//! history in `SQLite` with periodic retention sweeps.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): Models, errors and the backend port
//! - **Adapters** (`adapters`): Response cache, `SQLite` pool and store,
//!   Ollama client, HTTP surface
//! - **Service Layer** (`services`): Dispatcher, retention sweeper, persona
//!   prompt rendering
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zombie_dispatch::{ChatRequest, Config, Dispatcher, ScopeToken};
//! use zombie_dispatch::adapters::backends::{OllamaBackend, OllamaConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let backend = OllamaBackend::new(OllamaConfig::from(&config.backend))?;
//!     let dispatcher = Dispatcher::from_config(&config, Arc::new(backend))?;
//!     dispatcher.startup(true).await?;
//!
//!     let scope = ScopeToken::for_agent("hello_zombie");
//!     let reply = dispatcher
//!         .dispatch(&scope, ChatRequest::new("hello_zombie", "Hi"))
//!         .await?;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::cache::{CacheKey, CacheStats, ResponseCache};
pub use adapters::sqlite::{ConnectionPool, ConversationStore, PooledHandle};
pub use domain::errors::{BackendError, DispatchError, StorageError};
pub use domain::models::{
    ChatReply, ChatRequest, Config, ConversationRecord, Generation, LoggingConfig, ModelInfo,
    ScopeToken,
};
pub use domain::ports::LlmBackend;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Dispatcher, RetentionSweeper};
