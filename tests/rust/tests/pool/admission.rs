use std::sync::Arc;
use std::time::Duration;

use n8nmcp_core::{ErrorKind, GatewayError, PoolConfig};
use n8nmcp_gateway::ConnectionPool;
use tests::CloseLog;

fn pool(max_connections: usize) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(PoolConfig {
        max_connections,
        connection_timeout: Duration::from_secs(300),
        sweep_interval: Duration::from_secs(60),
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_never_exceed_capacity() {
    let pool = pool(10);
    let log = CloseLog::default();

    let attempts = (0..50).map(|i| {
        let pool = pool.clone();
        let conn = log.connection(&format!("client-{}", i));
        tokio::spawn(async move { pool.add_connection(conn) })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(GatewayError::PoolExhausted { max_connections: 10 })))
        .count();
    assert_eq!(admitted, 10);
    assert_eq!(exhausted, 40);
    assert_eq!(pool.active_count(), 10);
    assert_eq!(pool.total_accepted(), 10);
}

#[tokio::test]
async fn test_full_pool_admits_again_after_remove() {
    let pool = pool(100);
    let log = CloseLog::default();

    let mut ids = Vec::new();
    for i in 0..100 {
        ids.push(pool.add_connection(log.connection(&format!("c{}", i))).unwrap());
    }

    let err = pool.add_connection(log.connection("one-too-many")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolExhaustedError);
    assert_eq!(pool.active_count(), 100);

    assert!(pool.remove_connection(ids[0]).await);
    pool.add_connection(log.connection("late")).unwrap();
    assert_eq!(pool.active_count(), 100);
    assert_eq!(pool.total_accepted(), 101);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let pool = pool(5);
    let log = CloseLog::default();
    let id = pool.add_connection(log.connection("cursor")).unwrap();

    assert!(pool.remove_connection(id).await);
    assert!(!pool.remove_connection(id).await);
    assert!(!pool.contains(id));
    assert_eq!(pool.active_count(), 0);
    assert_eq!(log.closed(), 1);
}
