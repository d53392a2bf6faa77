//! Command line and environment configuration

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use n8nmcp_core::config::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_CONNECTIONS, DEFAULT_N8N_URL, DEFAULT_PORT,
    DEFAULT_SWEEP_INTERVAL,
};
use n8nmcp_core::resilience::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY};
use n8nmcp_core::{CallPolicy, GatewayConfig, N8nConfig, PoolConfig, RetryPolicy, TransportKind};

#[derive(Parser, Debug)]
#[command(name = "n8nmcp")]
#[command(version, about = "MCP server exposing n8n workflow management tools", long_about = None)]
pub struct Args {
    /// Base URL of the n8n instance
    #[arg(long, env = "N8N_API_URL", default_value = DEFAULT_N8N_URL)]
    pub n8n_url: String,

    /// n8n API key
    #[arg(long, env = "N8N_API_KEY", default_value = "", hide_default_value = true, hide_env_values = true)]
    pub n8n_api_key: String,

    /// Transport: stdio or http
    #[arg(long, env = "MCP_TRANSPORT", default_value = "stdio")]
    pub transport: TransportKind,

    /// Address to bind in http mode
    #[arg(short = 'H', long, env = "MCP_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind in http mode
    #[arg(short = 'p', long, env = "MCP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum concurrent client connections
    #[arg(long, env = "MCP_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Idle seconds before a connection is evicted
    #[arg(long, env = "MCP_CONNECTION_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECTION_TIMEOUT.as_secs())]
    pub connection_timeout_secs: u64,

    /// Seconds between idle sweeps
    #[arg(long, env = "MCP_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs())]
    pub sweep_interval_secs: u64,

    /// Per-attempt timeout for tool calls
    #[arg(long, env = "MCP_CALL_TIMEOUT_SECS", default_value_t = DEFAULT_CALL_TIMEOUT.as_secs())]
    pub call_timeout_secs: u64,

    /// Attempts for retryable read-only calls
    #[arg(long, env = "MCP_MAX_RETRIES", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub retries: u32,

    /// Base delay before the first retry, doubled on every attempt
    #[arg(long, env = "MCP_RETRY_BASE_DELAY_MS", default_value_t = DEFAULT_RETRY_BASE_DELAY.as_millis() as u64)]
    pub retry_base_delay_ms: u64,

    /// Start without probing the n8n API
    #[arg(long, env = "MCP_SKIP_CONNECTIVITY_CHECK")]
    pub skip_connectivity_check: bool,

    /// Directory for daily-rotated log files
    #[arg(long, env = "MCP_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            n8n: N8nConfig {
                base_url: self.n8n_url,
                api_key: self.n8n_api_key,
            },
            transport: self.transport,
            host: self.host,
            port: self.port,
            pool: PoolConfig {
                max_connections: self.max_connections,
                connection_timeout: Duration::from_secs(self.connection_timeout_secs),
                sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            },
            call_policy: CallPolicy {
                timeout: Duration::from_secs(self.call_timeout_secs),
                retry: RetryPolicy {
                    max_attempts: self.retries,
                    base_delay: Duration::from_millis(self.retry_base_delay_ms),
                },
            },
            skip_connectivity_check: self.skip_connectivity_check,
            log_dir: self.log_dir,
        }
    }
}
