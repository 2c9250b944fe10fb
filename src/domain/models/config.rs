use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the dispatcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Language-model backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Conversation storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Conversation retention configuration
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Assistant persona used to build the system prompt
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_server_port() -> u16 {
    12346
}

const fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            enable_cors: default_true(),
        }
    }
}

/// Ollama backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_backend_host")]
    pub host: String,

    /// Model used for every generation
    #[serde(default = "default_backend_model")]
    pub model: String,

    /// Upper bound on a single generation call
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,

    /// Upper bound on a readiness probe
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,

    /// Upper bound on a model listing call
    #[serde(default = "default_models_timeout_secs")]
    pub models_timeout_secs: u64,
}

fn default_backend_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_backend_model() -> String {
    "gemma:2b".to_string()
}

const fn default_generate_timeout_secs() -> u64 {
    30
}

const fn default_health_timeout_secs() -> u64 {
    5
}

const fn default_models_timeout_secs() -> u64 {
    10
}

impl BackendConfig {
    pub const fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    pub const fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub const fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_backend_host(),
            model: default_backend_model(),
            generate_timeout_secs: default_generate_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
            models_timeout_secs: default_models_timeout_secs(),
        }
    }
}

/// Conversation storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Path to the `SQLite` database file
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Maximum number of distinct pooled handles
    #[serde(default = "default_max_handles")]
    pub max_handles: usize,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/memory/hello_zombie_memory.sqlite")
}

const fn default_max_handles() -> usize {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_handles: default_max_handles(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Seconds a cached response stays valid
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached responses
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

const fn default_ttl_secs() -> u64 {
    3600
}

const fn default_max_entries() -> usize {
    1000
}

impl CacheConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

/// Conversation retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetentionConfig {
    /// Records older than this many days are deleted by a sweep
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Run a sweep once during server startup
    #[serde(default = "default_true")]
    pub sweep_on_startup: bool,
}

const fn default_horizon_days() -> u32 {
    30
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            sweep_on_startup: default_true(),
        }
    }
}

/// Assistant persona
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PersonaConfig {
    /// Display name, also used as the reply author
    #[serde(default = "default_persona_name")]
    pub name: String,

    /// Agent that requests without one (e.g. OpenAI-compatible calls) are recorded under
    #[serde(default = "default_agent")]
    pub default_agent: String,

    #[serde(default)]
    pub tagline: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub tone: Option<String>,

    /// Form of address the assistant opens with
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub rules: Vec<String>,

    #[serde(default)]
    pub skills: Vec<String>,
}

fn default_persona_name() -> String {
    "Hello Zombie".to_string()
}

fn default_agent() -> String {
    "hello_zombie".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            default_agent: default_agent(),
            tagline: None,
            owner: None,
            tone: None,
            prefix: None,
            rules: Vec::new(),
            skills: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Stdout format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: default_true(),
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}
