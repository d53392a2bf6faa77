//! n8n MCP Core
//!
//! Shared building blocks for the n8n MCP gateway:
//! - Error taxonomy ([`GatewayError`])
//! - Configuration ([`GatewayConfig`])
//! - Timeout and retry combinators
//! - n8n REST client behind the [`N8nApi`] trait

pub mod branding;
pub mod config;
pub mod domain;
pub mod error;
pub mod n8n;
pub mod resilience;

pub use config::{GatewayConfig, N8nConfig, PoolConfig, TransportKind};
pub use domain::*;
pub use error::{ErrorKind, FieldProblem, GatewayError, GatewayResult};
pub use n8n::{N8nApi, N8nClient};
pub use resilience::{with_retry, with_timeout, CallPolicy, RetryPolicy};
