use std::sync::Arc;
use std::time::Duration;

use n8nmcp_core::{ConnectionEventKind, ErrorKind, PoolConfig};
use n8nmcp_gateway::ConnectionPool;
use tests::CloseLog;

fn pool() -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(PoolConfig {
        max_connections: 10,
        connection_timeout: Duration::from_secs(30),
        sweep_interval: Duration::from_secs(5),
    }))
}

#[tokio::test]
async fn test_shutdown_closes_everything_and_refuses_new() {
    let pool = pool();
    let log = CloseLog::default();
    for i in 0..4 {
        pool.add_connection(log.connection(&format!("c{}", i))).unwrap();
    }

    pool.shutdown().await;

    assert_eq!(log.closed(), 4);
    assert_eq!(pool.active_count(), 0);
    assert!(pool.is_draining());
    let err = pool.add_connection(log.connection("late")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShutdownError);

    let disconnected = pool
        .recent_events(100)
        .into_iter()
        .filter(|e| e.kind == ConnectionEventKind::Disconnected)
        .count();
    assert_eq!(disconnected, 4);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_evicts_only_idle_connections() {
    let pool = pool();
    let log = CloseLog::default();
    let idle = pool.add_connection(log.connection("idle")).unwrap();
    let busy = pool.add_connection(log.connection("busy")).unwrap();

    tokio::time::advance(Duration::from_secs(20)).await;
    pool.touch_activity(busy);
    tokio::time::advance(Duration::from_secs(15)).await;

    let evicted = pool.sweep_idle().await;
    assert_eq!(evicted, vec![idle]);
    assert!(pool.contains(busy));
    assert_eq!(log.closed(), 1);

    let last = pool.recent_events(1).pop().unwrap();
    assert_eq!(last.kind, ConnectionEventKind::Timeout);
    assert_eq!(last.connection_id, idle);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeper_runs_on_interval() {
    let pool = pool();
    let log = CloseLog::default();
    pool.add_connection(log.connection("forgotten")).unwrap();
    pool.start_sweeper();

    tokio::time::sleep(Duration::from_secs(40)).await;

    assert_eq!(pool.active_count(), 0);
    assert_eq!(log.closed(), 1);
    pool.shutdown().await;
}
