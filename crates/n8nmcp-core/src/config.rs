//! Gateway configuration
//!
//! Built by the binary from CLI flags and environment, validated once before
//! any other component is constructed.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::resilience::{CallPolicy, RetryPolicy};

pub const DEFAULT_N8N_URL: &str = "http://localhost:5678";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Which front door the server runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" | "sse" => Ok(Self::Http),
            other => Err(format!("unknown transport '{}', expected stdio or http", other)),
        }
    }
}

/// n8n upstream settings
#[derive(Debug, Clone)]
pub struct N8nConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Connection pool settings
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub connection_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Full gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub n8n: N8nConfig,
    pub transport: TransportKind,
    pub host: IpAddr,
    pub port: u16,
    pub pool: PoolConfig,
    pub call_policy: CallPolicy,
    pub skip_connectivity_check: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            n8n: N8nConfig {
                base_url: DEFAULT_N8N_URL.to_string(),
                api_key: String::new(),
            },
            transport: TransportKind::Stdio,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            pool: PoolConfig::default(),
            call_policy: CallPolicy::default(),
            skip_connectivity_check: false,
            log_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Check every field that would make startup meaningless
    pub fn validate(&self) -> GatewayResult<()> {
        if self.n8n.api_key.trim().is_empty() {
            return Err(GatewayError::initialization(
                "N8N_API_KEY is required (set --n8n-api-key or the N8N_API_KEY environment variable)",
            ));
        }

        let url = Url::parse(&self.n8n.base_url).map_err(|e| {
            GatewayError::initialization(format!("Invalid n8n URL '{}': {}", self.n8n.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::initialization(format!(
                "n8n URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.pool.max_connections == 0 {
            return Err(GatewayError::initialization("max connections must be at least 1"));
        }
        if self.pool.connection_timeout.is_zero() {
            return Err(GatewayError::initialization("connection timeout must be non-zero"));
        }
        if self.pool.sweep_interval.is_zero() {
            return Err(GatewayError::initialization("sweep interval must be non-zero"));
        }
        if self.call_policy.timeout.is_zero() {
            return Err(GatewayError::initialization("call timeout must be non-zero"));
        }
        if self.call_policy.retry.max_attempts == 0 {
            return Err(GatewayError::initialization("retries must be at least 1 attempt"));
        }

        Ok(())
    }

    /// Convenience used by tests and embedders
    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.call_policy.retry = RetryPolicy {
            max_attempts,
            base_delay,
        };
        self
    }
}
