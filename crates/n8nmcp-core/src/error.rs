//! Gateway error taxonomy
//!
//! Every failure that crosses a component boundary is one of these kinds.
//! Raw `reqwest`/`serde_json` failures are re-wrapped by the n8n client and
//! never leak past it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Machine-readable error kind, as sent to protocol clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    UpstreamError,
    TimeoutError,
    PoolExhaustedError,
    ShutdownError,
    UnknownToolError,
    InitializationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "ValidationError",
            Self::UpstreamError => "UpstreamError",
            Self::TimeoutError => "TimeoutError",
            Self::PoolExhaustedError => "PoolExhaustedError",
            Self::ShutdownError => "ShutdownError",
            Self::UnknownToolError => "UnknownToolError",
            Self::InitializationError => "InitializationError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single argument problem reported by a tool's schema check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProblem {
    pub field: String,
    pub problem: String,
}

impl FieldProblem {
    pub fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }
}

/// Gateway error
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Invocation arguments failed the tool's argument schema
    #[error("Invalid arguments for {tool}: {}", summarize(.problems))]
    Validation {
        tool: String,
        problems: Vec<FieldProblem>,
    },

    /// n8n answered non-2xx, was unreachable, or sent an undecodable body
    #[error("n8n API {method} {endpoint} failed{}: {message}", status_suffix(.status))]
    Upstream {
        method: String,
        endpoint: String,
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },

    /// An operation exceeded its allotted duration
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// The connection pool is at capacity
    #[error("Connection pool exhausted ({max_connections} active connections)")]
    PoolExhausted { max_connections: usize },

    /// The server is draining
    #[error("Server is shutting down")]
    Shutdown,

    /// The invocation names a tool that is not registered
    #[error("Unknown tool: {tool}")]
    UnknownTool {
        tool: String,
        available: Vec<String>,
    },

    /// Startup failed; fatal
    #[error("Initialization failed: {reason}")]
    Initialization { reason: String },
}

fn summarize(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(|p| format!("{} {}", p.field, p.problem))
        .collect::<Vec<_>>()
        .join("; ")
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {}", s)).unwrap_or_default()
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn validation(tool: impl Into<String>, field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::Validation {
            tool: tool.into(),
            problems: vec![FieldProblem::new(field, problem)],
        }
    }

    pub fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::Upstream { .. } => ErrorKind::UpstreamError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::PoolExhausted { .. } => ErrorKind::PoolExhaustedError,
            Self::Shutdown => ErrorKind::ShutdownError,
            Self::UnknownTool { .. } => ErrorKind::UnknownToolError,
            Self::Initialization { .. } => ErrorKind::InitializationError,
        }
    }

    /// Whether the retry wrapper may attempt the operation again.
    ///
    /// Upstream failures are only retryable for GET requests; everything
    /// else that changes n8n state may already have taken effect.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { method, status, .. } => {
                method.eq_ignore_ascii_case("GET") && !matches!(status, Some(400..=499))
            }
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// HTTP status of an upstream failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    /// Structured details for protocol clients
    pub fn details(&self) -> Value {
        match self {
            Self::Validation { tool, problems } => json!({
                "tool": tool,
                "fields": problems.iter().map(|p| p.field.as_str()).collect::<Vec<_>>(),
                "problems": problems,
            }),
            Self::Upstream {
                method,
                endpoint,
                status,
                body,
                ..
            } => json!({
                "method": method,
                "endpoint": endpoint,
                "statusCode": status,
                "body": body,
            }),
            Self::Timeout { operation, after } => json!({
                "operation": operation,
                "timeoutMs": after.as_millis() as u64,
            }),
            Self::PoolExhausted { max_connections } => json!({
                "maxConnections": max_connections,
            }),
            Self::Shutdown => json!({}),
            Self::UnknownTool { tool, available } => json!({
                "tool": tool,
                "availableTools": available,
            }),
            Self::Initialization { reason } => json!({ "reason": reason }),
        }
    }
}
