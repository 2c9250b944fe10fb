//! Connection pool capacity and sharing behavior.

mod common;

use futures::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use zombie_dispatch::{ConnectionPool, ScopeToken, StorageError};

#[tokio::test]
async fn test_distinct_handles_never_exceed_cap() {
    let (_dir, path) = common::temp_db_path();
    let pool = ConnectionPool::open(&path, 10).unwrap();

    let mut handle_ids = HashSet::new();
    for i in 0..25 {
        let handle = pool
            .acquire(&ScopeToken::new(format!("worker-{i}")))
            .await
            .expect("acquire should fall back, not fail");
        handle_ids.insert(handle.id());
    }

    assert_eq!(pool.active_handles().await, 10);
    assert_eq!(handle_ids.len(), 10);
}

#[tokio::test]
async fn test_fallback_is_stable_per_scope() {
    let (_dir, path) = common::temp_db_path();
    let pool = ConnectionPool::open(&path, 2).unwrap();
    pool.acquire(&ScopeToken::new("a")).await.unwrap();
    pool.acquire(&ScopeToken::new("b")).await.unwrap();

    let overflow = ScopeToken::new("c");
    let first = pool.acquire(&overflow).await.unwrap();
    let second = pool.acquire(&overflow).await.unwrap();

    assert!(first.same_connection(&second));
    assert_eq!(pool.active_handles().await, 2);
}

#[tokio::test]
async fn test_concurrent_acquire_respects_cap() {
    let (_dir, path) = common::temp_db_path();
    let pool = Arc::new(ConnectionPool::open(&path, 4).unwrap());

    let acquisitions = (0..32).map(|i| {
        let pool = Arc::clone(&pool);
        async move { pool.acquire(&ScopeToken::new(format!("s{i}"))).await }
    });
    let handles: Vec<_> = join_all(acquisitions)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("all acquisitions should succeed");

    assert_eq!(handles.len(), 32);
    assert_eq!(pool.active_handles().await, 4);
    let distinct: HashSet<_> = handles.iter().map(|h| h.id()).collect();
    assert_eq!(distinct.len(), 4);
}

#[tokio::test]
async fn test_shared_handle_serializes_writes() {
    let (_dir, path) = common::temp_db_path();
    let pool = Arc::new(ConnectionPool::open(&path, 1).unwrap());

    {
        let handle = pool.acquire(&ScopeToken::maintenance()).await.unwrap();
        let mut conn = handle.lock().await;
        sqlx::query("CREATE TABLE hits (n INTEGER)")
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    let writers = (0..10).map(|i| {
        let pool = Arc::clone(&pool);
        async move {
            let handle = pool.acquire(&ScopeToken::new(format!("w{i}"))).await.unwrap();
            let mut conn = handle.lock().await;
            sqlx::query("INSERT INTO hits (n) VALUES (?)")
                .bind(i)
                .execute(&mut *conn)
                .await
                .unwrap();
        }
    });
    join_all(writers).await;

    let handle = pool.acquire(&ScopeToken::maintenance()).await.unwrap();
    let mut conn = handle.lock().await;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hits")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(count, 10);
}

#[tokio::test]
async fn test_handle_creation_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the database file should be cannot be opened as one.
    let path = dir.path().join("occupied");
    std::fs::create_dir(&path).unwrap();

    let pool = ConnectionPool::open(&path, 2).unwrap();
    let err = pool.acquire(&ScopeToken::new("x")).await.unwrap_err();

    assert!(matches!(err, StorageError::HandleCreation(_)));
    assert_eq!(pool.active_handles().await, 0);
}

#[tokio::test]
async fn test_directory_creation_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = ConnectionPool::open(blocker.join("nested").join("db.sqlite"), 2)
        .err()
        .expect("open should fail when an ancestor is a file");
    assert!(matches!(err, StorageError::DirectoryCreation(_)));
}

#[tokio::test]
async fn test_storage_size_tracks_file() {
    let (_dir, path) = common::temp_db_path();
    let pool = ConnectionPool::open(&path, 1).unwrap();
    assert_eq!(pool.storage_size_bytes(), 0);
    assert!(!pool.storage_exists());

    let handle = pool.acquire(&ScopeToken::maintenance()).await.unwrap();
    {
        let mut conn = handle.lock().await;
        sqlx::query("CREATE TABLE t (x TEXT)")
            .execute(&mut *conn)
            .await
            .unwrap();
    }
    assert!(pool.storage_exists());
    pool.close().await;
    drop(handle);
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map_or(0, |meta| meta.len())
}

#[tokio::test]
async fn test_storage_size_includes_write_ahead_log() {
    let (_dir, path) = common::temp_db_path();
    let pool = ConnectionPool::open(&path, 1).unwrap();
    let handle = pool.acquire(&ScopeToken::maintenance()).await.unwrap();
    {
        let mut conn = handle.lock().await;
        sqlx::query("CREATE TABLE t (x TEXT)")
            .execute(&mut *conn)
            .await
            .unwrap();
        for i in 0..50 {
            sqlx::query("INSERT INTO t (x) VALUES (?)")
                .bind("x".repeat(200 + i))
                .execute(&mut *conn)
                .await
                .unwrap();
        }
    }

    let wal = path.with_file_name("test.sqlite-wal");
    let shm = path.with_file_name("test.sqlite-shm");
    // The open connection has not checkpointed, so recent pages sit in the log.
    assert!(file_len(&wal) > 0);
    assert_eq!(
        pool.storage_size_bytes(),
        file_len(&path) + file_len(&wal) + file_len(&shm)
    );
    assert!(pool.storage_size_bytes() > file_len(&path));

    pool.close().await;
    drop(handle);
}
