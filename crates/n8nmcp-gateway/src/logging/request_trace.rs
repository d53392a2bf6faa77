use axum::extract::Request;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

use crate::mcp::SESSION_ID_HEADER;

/// Upper bound on a buffered JSON-RPC request body
pub const MAX_RPC_BODY_BYTES: usize = 4 * 1024 * 1024;

/// 6 hex characters, enough to tell concurrent requests apart in a log tail
pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

/// What a JSON-RPC request body asks for
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcSummary {
    pub method: String,
    /// Absent for notifications
    pub id: Option<Value>,
    /// Tool name of a `tools/call`
    pub tool: Option<String>,
}

impl JsonRpcSummary {
    /// `None` for batches, responses and anything that is not JSON
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let body: Value = serde_json::from_slice(bytes).ok()?;
        let method = body.get("method")?.as_str()?.to_string();
        let tool = match method.as_str() {
            "tools/call" => body["params"]["name"].as_str().map(str::to_string),
            _ => None,
        };
        Some(Self {
            id: body.get("id").cloned(),
            method,
            tool,
        })
    }

    pub fn is_initialize(&self) -> bool {
        self.method == "initialize"
    }

    /// `tools/call:list_workflows`, `tools/list`, ...
    pub fn label(&self) -> String {
        match &self.tool {
            Some(tool) => format!("{}:{}", self.method, tool),
            None => self.method.clone(),
        }
    }
}

/// Correlation data for one HTTP request, stored in request extensions
#[derive(Debug, Clone)]
pub struct RequestTrace {
    pub trace_id: String,
    pub method: String,
    pub path: String,
    pub session_id: Option<String>,
    pub rpc: Option<JsonRpcSummary>,
    started_at: Instant,
}

impl RequestTrace {
    pub fn from_request(request: &Request) -> Self {
        Self {
            trace_id: new_trace_id(),
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            session_id: request
                .headers()
                .get(SESSION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            rpc: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_rpc(mut self, rpc: Option<JsonRpcSummary>) -> Self {
        self.rpc = rpc;
        self
    }

    pub fn is_mcp(&self) -> bool {
        self.path == "/mcp"
    }

    pub fn span(&self) -> Span {
        info_span!("http", trace_id = %self.trace_id)
    }

    /// First 8 characters of the session id, or "-"
    pub fn short_session(&self) -> &str {
        match &self.session_id {
            Some(id) => id.get(..8).unwrap_or(id),
            None => "-",
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// One line per request; health checks log at debug
    pub fn log_exit(&self, status: u16) {
        let rpc = self.rpc.as_ref().map(JsonRpcSummary::label);
        let rpc = rpc.as_deref().unwrap_or("-");
        let elapsed_ms = self.elapsed_ms();

        if status >= 500 {
            warn!(status, elapsed_ms, session = self.short_session(), rpc, "{} {}", self.method, self.path);
        } else if self.is_mcp() {
            info!(status, elapsed_ms, session = self.short_session(), rpc, "{} {}", self.method, self.path);
        } else {
            debug!(status, elapsed_ms, "{} {}", self.method, self.path);
        }
    }
}
