//! Common test utilities for integration tests
//!
//! Provides temp-file databases and dispatchers wired to a scripted backend.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use zombie_dispatch::adapters::backends::MockBackend;
use zombie_dispatch::services::DispatcherSettings;
use zombie_dispatch::{
    ConnectionPool, ConversationStore, Dispatcher, ResponseCache, RetentionSweeper,
};

/// Create a temporary test database path
///
/// The file does not exist until the first handle is opened.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("memory").join("test.sqlite");
    (dir, db_path)
}

/// An initialized conversation store over a fresh temp database
pub async fn temp_store(max_handles: usize) -> (TempDir, ConversationStore) {
    let (dir, path) = temp_db_path();
    let pool = ConnectionPool::open(&path, max_handles).expect("Failed to open pool");
    let store = ConversationStore::new(Arc::new(pool));
    store.initialize().await.expect("Failed to initialize store");
    (dir, store)
}

pub fn settings(generate_timeout: Duration) -> DispatcherSettings {
    DispatcherSettings {
        model: "gemma:2b".to_string(),
        author: "Hello Zombie".to_string(),
        default_agent: "hello_zombie".to_string(),
        generate_timeout,
        system_prompt: "You are Hello Zombie, a local AI assistant.".to_string(),
    }
}

/// Everything a dispatcher test needs to inspect afterwards
pub struct TestDispatcher {
    pub dir: TempDir,
    pub backend: Arc<MockBackend>,
    pub dispatcher: Arc<Dispatcher>,
}

impl TestDispatcher {
    pub fn store(&self) -> &ConversationStore {
        self.dispatcher.store()
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        self.dispatcher.cache()
    }
}

/// A started dispatcher around `backend` with the given backend timeout
pub async fn test_dispatcher(backend: MockBackend, generate_timeout: Duration) -> TestDispatcher {
    let (dir, store) = temp_store(10).await;
    let backend = Arc::new(backend);
    let sweeper = RetentionSweeper::new(store.clone(), 30);
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(3600), 1000));
    let dispatcher = Dispatcher::new(
        backend.clone(),
        cache,
        store,
        sweeper,
        settings(generate_timeout),
    );
    dispatcher.startup(false).await.expect("Startup failed");

    TestDispatcher {
        dir,
        backend,
        dispatcher: Arc::new(dispatcher),
    }
}
