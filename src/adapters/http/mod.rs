//! HTTP surface: the dispatcher's own routes plus the OpenAI-compatible ones.

pub mod openai;
pub mod server;

pub use server::{shutdown_signal, DispatchHttpServer, ErrorResponse, HttpConfig, MAX_INPUT_CHARS};
