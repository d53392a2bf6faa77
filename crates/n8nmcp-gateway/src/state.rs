//! Server state shared by both front doors
//!
//! One [`ServerState`] owns the pool, the dispatcher and the start time. The
//! health and metrics snapshots read atomics only and never take the pool lock.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use n8nmcp_core::branding;
use n8nmcp_core::{GatewayConfig, N8nApi};

use crate::dispatcher::Dispatcher;
use crate::pool::ConnectionPool;
use crate::tools::ToolRegistry;

/// Liveness snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: &'static str,
    /// Seconds since start
    pub uptime: u64,
    pub active_connections: usize,
    pub total_connections: u64,
    /// Resident set size in bytes, when the platform exposes it
    pub memory_used: Option<u64>,
    pub version: &'static str,
}

/// Counter snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub active_connections: usize,
    pub total_connections: u64,
    pub max_connections: usize,
    pub uptime: u64,
}

pub struct ServerState {
    config: GatewayConfig,
    pool: Arc<ConnectionPool>,
    dispatcher: Arc<Dispatcher>,
    started_at: Instant,
}

impl ServerState {
    pub fn new(config: GatewayConfig, api: Arc<dyn N8nApi>) -> Self {
        let registry = Arc::new(ToolRegistry::new(config.call_policy));
        Self {
            pool: Arc::new(ConnectionPool::new(config.pool)),
            dispatcher: Arc::new(Dispatcher::new(registry, api)),
            started_at: Instant::now(),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: if self.pool.is_draining() {
                "draining"
            } else {
                "healthy"
            },
            uptime: self.uptime_secs(),
            active_connections: self.pool.active_count(),
            total_connections: self.pool.total_accepted(),
            memory_used: resident_memory_bytes(),
            version: branding::VERSION,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let counters = self.dispatcher.counters();
        MetricsSnapshot {
            request_count: counters.request_count,
            success_count: counters.success_count,
            failure_count: counters.failure_count,
            active_connections: self.pool.active_count(),
            total_connections: self.pool.total_accepted(),
            max_connections: self.pool.max_connections(),
            uptime: self.uptime_secs(),
        }
    }
}

#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    vm_rss_bytes(&status)
}

/// `VmRSS` is reported in kB regardless of the kernel page size
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn vm_rss_bytes(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(value * 1024),
        Some(_) => None,
    }
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Option<u64> {
    None
}
