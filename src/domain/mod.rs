//! Domain layer: models, errors and the ports adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{BackendError, DispatchError, DispatchResult, StorageError, StorageResult};
