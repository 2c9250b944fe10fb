//! Language-model backend adapters.

pub mod mock;
pub mod ollama;

pub use mock::MockBackend;
pub use ollama::{OllamaBackend, OllamaConfig};
