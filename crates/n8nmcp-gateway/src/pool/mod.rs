//! Connection Pool
//!
//! Bounded set of live client connections with idle eviction and drain.
//!
//! Membership, state transitions and the event ring live behind a single
//! `parking_lot::Mutex`; the capacity check and the insert happen in the same
//! critical section. Transport handles are closed outside the lock.

mod connection;

pub use connection::{CancelHandle, Connection, TransportHandle};

use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use n8nmcp_core::{
    ConnectionEvent, ConnectionEventKind, ConnectionId, ConnectionInfo, ConnectionState, GatewayError,
    GatewayResult, PoolConfig,
};

/// Maximum number of events kept for diagnostics
pub const EVENT_CAPACITY: usize = 1000;

struct PoolInner {
    connections: HashMap<ConnectionId, Connection>,
    events: VecDeque<ConnectionEvent>,
}

impl PoolInner {
    fn record(&mut self, event: ConnectionEvent) {
        if self.events.len() == EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Connection pool
pub struct ConnectionPool {
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    draining: AtomicBool,
    active: AtomicUsize,
    total_accepted: AtomicU64,
    sweep_cancel: CancellationToken,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(PoolInner {
                connections: HashMap::new(),
                events: VecDeque::new(),
            }),
            draining: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            total_accepted: AtomicU64::new(0),
            sweep_cancel: CancellationToken::new(),
            sweep_task: Mutex::new(None),
        }
    }

    /// Admit a connection.
    ///
    /// Fails with `ShutdownError` while draining, `PoolExhaustedError` at
    /// capacity and `InitializationError` if the id is already registered. On
    /// failure the connection (and its handle) is dropped unclosed.
    pub fn add_connection(&self, mut conn: Connection) -> GatewayResult<ConnectionId> {
        let id = conn.id;
        let mut inner = self.inner.lock();

        if self.draining.load(Ordering::SeqCst) {
            return Err(GatewayError::Shutdown);
        }
        if inner.connections.contains_key(&id) {
            inner.record(
                ConnectionEvent::new(ConnectionEventKind::Error, id).with_detail("duplicate connection id"),
            );
            return Err(GatewayError::initialization(format!(
                "Connection {} is already registered",
                id
            )));
        }
        if inner.connections.len() >= self.config.max_connections {
            inner.record(
                ConnectionEvent::new(ConnectionEventKind::Error, id).with_detail("pool exhausted"),
            );
            return Err(GatewayError::PoolExhausted {
                max_connections: self.config.max_connections,
            });
        }

        conn.state = ConnectionState::Active;
        conn.last_activity = Instant::now();
        let transport = conn.transport;
        let client = conn.client.display_name().to_string();
        inner.connections.insert(id, conn);
        inner.record(ConnectionEvent::new(ConnectionEventKind::Connected, id));
        self.active.store(inner.connections.len(), Ordering::Release);
        self.total_accepted.fetch_add(1, Ordering::Relaxed);
        drop(inner);

        info!(connection_id = %id, %transport, client = %client, "Connection registered");
        Ok(id)
    }

    /// Remove a connection and close its transport. Idempotent; returns
    /// whether the id was present.
    pub async fn remove_connection(&self, id: ConnectionId) -> bool {
        self.evict(id, ConnectionEventKind::Disconnected).await
    }

    async fn evict(&self, id: ConnectionId, kind: ConnectionEventKind) -> bool {
        match self.take(id, |_| true) {
            Some(conn) => {
                self.close(conn, kind).await;
                true
            }
            None => false,
        }
    }

    async fn close(&self, mut conn: Connection, kind: ConnectionEventKind) {
        let id = conn.id;
        if let Err(e) = conn.handle.close().await {
            warn!(connection_id = %id, error = %e, "Failed to close transport");
            self.inner.lock().record(
                ConnectionEvent::new(ConnectionEventKind::Error, id).with_detail(e.to_string()),
            );
        }
        conn.state = ConnectionState::Closed;

        self.inner.lock().record(ConnectionEvent::new(kind, id));
        match kind {
            ConnectionEventKind::Timeout => info!(connection_id = %id, "Connection evicted after idle timeout"),
            _ => debug!(connection_id = %id, "Connection removed"),
        }
    }

    /// Remove `id` if `condition` still holds for it under the lock
    fn take(&self, id: ConnectionId, condition: impl FnOnce(&Connection) -> bool) -> Option<Connection> {
        let mut inner = self.inner.lock();
        if !condition(inner.connections.get(&id)?) {
            return None;
        }
        let mut conn = inner.connections.remove(&id)?;
        conn.state = ConnectionState::Closing;
        self.active.store(inner.connections.len(), Ordering::Release);
        Some(conn)
    }

    /// Record activity; unknown ids are ignored
    pub fn touch_activity(&self, id: ConnectionId) {
        if let Some(conn) = self.inner.lock().connections.get_mut(&id) {
            conn.last_activity = Instant::now();
        }
    }

    /// Record a transport-level error against a connection
    pub fn record_error(&self, id: ConnectionId, detail: impl Into<String>) {
        self.inner
            .lock()
            .record(ConnectionEvent::new(ConnectionEventKind::Error, id).with_detail(detail));
    }

    /// Evict every connection idle longer than the configured timeout
    pub async fn sweep_idle(&self) -> Vec<ConnectionId> {
        let timeout = self.config.connection_timeout;
        let stale: Vec<ConnectionId> = {
            let inner = self.inner.lock();
            inner
                .connections
                .values()
                .filter(|c| c.last_activity.elapsed() > timeout)
                .map(|c| c.id)
                .collect()
        };

        let mut evicted = Vec::with_capacity(stale.len());
        for id in stale {
            // activity may have landed since the scan
            if let Some(conn) = self.take(id, |c| c.last_activity.elapsed() > timeout) {
                self.close(conn, ConnectionEventKind::Timeout).await;
                evicted.push(id);
            }
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Idle sweep evicted connections");
        }
        evicted
    }

    /// Start the background idle sweep. Calling twice is a no-op.
    pub fn start_sweeper(self: &Arc<Self>) {
        let mut slot = self.sweep_task.lock();
        if slot.is_some() {
            return;
        }

        let pool: Weak<Self> = Arc::downgrade(self);
        let cancel = self.sweep_cancel.clone();
        let interval = self.config.sweep_interval;

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(pool) = pool.upgrade() else { break };
                if let Err(panic) = AssertUnwindSafe(pool.sweep_idle()).catch_unwind().await {
                    error!(panic = %describe_panic(&*panic), "Idle sweep panicked; continuing");
                }
            }
            debug!("Idle sweep stopped");
        }));
    }

    /// Stop admitting, stop the sweep and close every connection concurrently
    pub async fn shutdown(&self) {
        let ids: Vec<ConnectionId> = {
            let inner = self.inner.lock();
            self.draining.store(true, Ordering::SeqCst);
            inner.connections.keys().copied().collect()
        };
        self.sweep_cancel.cancel();

        info!(connections = ids.len(), "Draining connection pool");
        join_all(ids.into_iter().map(|id| self.remove_connection(id))).await;

        if let Some(task) = self.sweep_task.lock().take() {
            task.abort();
        }
        info!("Connection pool drained");
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.inner.lock().connections.contains_key(&id)
    }

    /// Published without taking the membership lock
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn total_accepted(&self) -> u64 {
        self.total_accepted.load(Ordering::Relaxed)
    }

    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    pub fn connection_timeout(&self) -> Duration {
        self.config.connection_timeout
    }

    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Most recent events, newest last
    pub fn recent_events(&self, limit: usize) -> Vec<ConnectionEvent> {
        let inner = self.inner.lock();
        let skip = inner.events.len().saturating_sub(limit);
        inner.events.iter().skip(skip).cloned().collect()
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.inner.lock().connections.values().map(Connection::info).collect()
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn describe_panic(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
