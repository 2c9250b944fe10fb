//! Infrastructure adapters for external systems.

pub mod backends;
pub mod cache;
pub mod http;
pub mod sqlite;
