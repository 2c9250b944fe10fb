pub mod chat;
pub mod config;
pub mod conversation;
pub mod scope;

pub use chat::{ChatReply, ChatRequest, Generation, ModelInfo};
pub use config::{
    BackendConfig, CacheConfig, Config, LogFormat, LoggingConfig, PersonaConfig,
    RetentionConfig, RotationPolicy, ServerConfig, StorageConfig,
};
pub use conversation::{conversation_id, timestamp_key, ConversationRecord};
pub use scope::ScopeToken;
