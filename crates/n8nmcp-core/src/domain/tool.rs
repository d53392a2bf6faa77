//! Tool invocation and result envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::connection::ConnectionId;
use crate::error::{ErrorKind, GatewayError};

/// One inbound tool call
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub raw_arguments: Value,
    /// Absent for in-process calls
    pub connection_id: Option<ConnectionId>,
    pub requested_at: DateTime<Utc>,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, raw_arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            raw_arguments,
            connection_id: None,
            requested_at: Utc::now(),
        }
    }

    pub fn from_connection(mut self, id: ConnectionId) -> Self {
        self.connection_id = Some(id);
        self
    }
}

/// Error half of a tool result, as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Value,
}

impl From<&GatewayError> for ToolFailure {
    fn from(err: &GatewayError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}

/// Exactly one of success or failure
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Failure(ToolFailure),
}

impl ToolResult {
    pub fn failure(err: &GatewayError) -> Self {
        Self::Failure(err.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ToolFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f),
        }
    }

    /// `{success, data?, error?: {kind, message, details}}`
    pub fn to_envelope(&self) -> Value {
        match self {
            Self::Success(data) => json!({ "success": true, "data": data }),
            Self::Failure(f) => json!({
                "success": false,
                "error": {
                    "kind": f.kind,
                    "message": f.message,
                    "details": f.details,
                }
            }),
        }
    }
}

impl From<Result<Value, GatewayError>> for ToolResult {
    fn from(result: Result<Value, GatewayError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(e) => Self::failure(&e),
        }
    }
}
