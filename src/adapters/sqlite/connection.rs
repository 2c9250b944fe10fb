//! Scope-keyed `SQLite` connection pool.
//!
//! Each [`ScopeToken`] gets a dedicated connection until `max_handles`
//! connections exist. After that, new scopes share an existing connection and
//! serialize on its mutex instead of opening more files. Handles are never
//! returned to a free list; they live until [`ConnectionPool::close`].

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::domain::errors::{StorageError, StorageResult};
use crate::domain::models::ScopeToken;

/// A live connection to the conversation database.
///
/// Clones share the same connection; every use goes through [`lock`](Self::lock).
#[derive(Clone)]
pub struct PooledHandle {
    id: usize,
    conn: Arc<Mutex<SqliteConnection>>,
}

impl PooledHandle {
    /// Position of this handle in creation order.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Exclusive access to the underlying connection.
    pub async fn lock(&self) -> MutexGuard<'_, SqliteConnection> {
        self.conn.lock().await
    }

    /// Whether two handles wrap the same connection.
    pub fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

impl fmt::Debug for PooledHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledHandle").field("id", &self.id).finish()
    }
}

#[derive(Default)]
struct Registry {
    by_scope: HashMap<ScopeToken, usize>,
    handles: Vec<PooledHandle>,
}

/// Bounded registry of storage handles keyed by caller scope.
pub struct ConnectionPool {
    path: PathBuf,
    options: SqliteConnectOptions,
    max_handles: usize,
    registry: Mutex<Registry>,
}

impl ConnectionPool {
    /// Prepare a pool for the database file at `path`.
    ///
    /// Creates the parent directory if needed but opens no connection; the
    /// first [`acquire`](Self::acquire) does. `max_handles` is clamped to at
    /// least 1.
    pub fn open(path: impl AsRef<Path>, max_handles: usize) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_database_directory(&path)?;

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        Ok(Self {
            path,
            options,
            max_handles: max_handles.max(1),
            registry: Mutex::new(Registry::default()),
        })
    }

    /// Get the handle bound to `scope`, creating one while under the cap.
    ///
    /// At the cap, the scope is handed an existing handle picked from its
    /// hash, so repeated calls for one scope land on the same connection. A
    /// failed connect is returned as-is and leaves the registry untouched.
    pub async fn acquire(&self, scope: &ScopeToken) -> StorageResult<PooledHandle> {
        let mut registry = self.registry.lock().await;

        if let Some(&index) = registry.by_scope.get(scope) {
            return Ok(registry.handles[index].clone());
        }

        if registry.handles.len() < self.max_handles {
            let conn = self
                .options
                .connect()
                .await
                .map_err(StorageError::HandleCreation)?;
            let handle = PooledHandle {
                id: registry.handles.len(),
                conn: Arc::new(Mutex::new(conn)),
            };
            registry.handles.push(handle.clone());
            registry.by_scope.insert(scope.clone(), handle.id());

            info!(
                scope = %scope,
                handle = handle.id(),
                active = registry.handles.len(),
                "opened storage handle"
            );
            return Ok(handle);
        }

        let shared = registry.handles[shared_index(scope, registry.handles.len())].clone();
        debug!(scope = %scope, handle = shared.id(), "pool at capacity, sharing handle");
        Ok(shared)
    }

    /// Number of distinct live handles.
    pub async fn active_handles(&self) -> usize {
        self.registry.lock().await.handles.len()
    }

    pub const fn max_handles(&self) -> usize {
        self.max_handles
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes on disk for the database, its `-wal` log and `-shm` index.
    ///
    /// Files that do not exist count as 0.
    pub fn storage_size_bytes(&self) -> u64 {
        [
            self.path.clone(),
            sidecar_path(&self.path, "-wal"),
            sidecar_path(&self.path, "-shm"),
        ]
        .iter()
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum()
    }

    /// Whether the database file exists.
    pub fn storage_exists(&self) -> bool {
        self.path.exists()
    }

    /// Close every handle and empty the registry.
    ///
    /// Handles still cloned by in-flight callers are closed when their last
    /// clone drops.
    pub async fn close(&self) {
        let handles = {
            let mut registry = self.registry.lock().await;
            registry.by_scope.clear();
            std::mem::take(&mut registry.handles)
        };

        let count = handles.len();
        for handle in handles {
            let id = handle.id();
            if let Ok(conn) = Arc::try_unwrap(handle.conn) {
                if let Err(e) = conn.into_inner().close().await {
                    warn!(handle = id, error = %e, "failed to close storage handle");
                }
            }
        }
        info!(closed = count, "storage pool closed");
    }
}

fn shared_index(scope: &ScopeToken, len: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    scope.hash(&mut hasher);
    // `len` is at most `max_handles`, so the remainder always fits.
    usize::try_from(hasher.finish() % len as u64).unwrap_or(0)
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn ensure_database_directory(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(StorageError::DirectoryCreation)?;
        }
    }
    Ok(())
}
