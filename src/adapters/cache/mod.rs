//! In-memory response cache.
//!
//! Keyed on the literal `(prompt, model)` identity. Entries expire after a TTL
//! and the map is bounded by bulk eviction of the oldest fifth when full.

pub mod response_cache;

pub use response_cache::{CacheKey, CacheStats, ResponseCache};
