//! n8n MCP Handler
//!
//! Implements the MCP `ServerHandler` trait. `tools/list` is served from the
//! registry, `tools/call` goes through the dispatcher, and the custom
//! `server/health` and `server/metrics` requests expose the state snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rmcp::{
    model::*,
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use n8nmcp_core::branding;
use n8nmcp_core::{ClientDescriptor, ConnectionId, GatewayError, ToolInvocation, ToolResult, TransportKind};

use super::context::extract_connection_id;
use crate::pool::{CancelHandle, Connection};
use crate::state::ServerState;

pub const HEALTH_METHOD: &str = "server/health";
pub const METRICS_METHOD: &str = "server/metrics";

/// JSON-RPC code answering an `initialize` the pool refused
pub const CONNECTION_REJECTED: ErrorCode = ErrorCode(-32000);

/// Pool admission deferred to the session's `initialize`
#[derive(Clone)]
struct PendingAdmission {
    cancel: CancellationToken,
    attempted: Arc<AtomicBool>,
}

/// Handler shared by both front doors.
///
/// A stdio session binds its connection id at construction and joins the
/// pool when its `initialize` arrives; HTTP handlers are shared across
/// sessions and read the id from the request headers.
#[derive(Clone)]
pub struct N8nMcpHandler {
    state: Arc<ServerState>,
    connection_id: Option<ConnectionId>,
    admission: Option<PendingAdmission>,
}

impl N8nMcpHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            connection_id: None,
            admission: None,
        }
    }

    /// Handler for one stdio session; pool eviction cancels `cancel`
    pub fn for_stdio(state: Arc<ServerState>, id: ConnectionId, cancel: CancellationToken) -> Self {
        Self {
            state,
            connection_id: Some(id),
            admission: Some(PendingAdmission {
                cancel,
                attempted: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Register the session with the pool, once
    fn admit(&self, params: &InitializeRequestParams) -> Result<(), McpError> {
        let (Some(id), Some(admission)) = (self.connection_id, &self.admission) else {
            return Ok(());
        };
        if admission.attempted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let client = ClientDescriptor::new(params.client_info.name.clone(), params.client_info.version.clone())
            .with_protocol_version(params.protocol_version.to_string());
        let conn = Connection::with_id(
            id,
            TransportKind::Stdio,
            client,
            Box::new(CancelHandle::new(admission.cancel.clone())),
        );
        self.state.pool().add_connection(conn).map(|_| ()).map_err(|e| {
            warn!(connection_id = %id, kind = %e.kind(), "Connection rejected: {}", e);
            rejection_error(&e)
        })
    }

    fn connection(&self, extensions: &Extensions) -> Option<ConnectionId> {
        self.connection_id.or_else(|| extract_connection_id(extensions))
    }

    fn touch(&self, connection: Option<ConnectionId>) {
        if let Some(id) = connection {
            self.state.pool().touch_activity(id);
        }
    }

    /// Highest protocol version both sides support
    fn negotiate_protocol_version(&self, client_version: &str) -> ProtocolVersion {
        let ours = ProtocolVersion::LATEST;
        if client_version > ours.to_string().as_str() {
            debug!(client_version, our_max = %ours, "Client uses newer protocol, negotiating down");
            return ours;
        }
        serde_json::from_value(Value::String(client_version.to_string())).unwrap_or(ours)
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.state
            .dispatcher()
            .registry()
            .iter()
            .map(|t| Tool::new(t.name, t.description, t.input_schema.clone()))
            .collect()
    }
}

/// JSON-RPC error carrying the pool's refusal, with the same `kind` and
/// `details` as the HTTP 503 body
pub fn rejection_error(err: &GatewayError) -> McpError {
    McpError::new(
        CONNECTION_REJECTED,
        err.to_string(),
        Some(json!({
            "kind": err.kind().as_str(),
            "details": err.details(),
        })),
    )
}

/// Wire form of a tool result: the envelope as text, the same JSON as
/// structured content, and `isError` on failure
pub fn call_tool_result(result: &ToolResult) -> CallToolResult {
    let envelope = result.to_envelope();
    CallToolResult {
        content: vec![Content::text(envelope.to_string())],
        structured_content: Some(envelope),
        is_error: Some(!result.is_success()),
        meta: None,
    }
}

impl ServerHandler for N8nMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools_with(ToolsCapability {
                    list_changed: Some(false),
                })
                .build(),
            server_info: Implementation {
                name: branding::SERVER_NAME.to_string(),
                version: branding::VERSION.to_string(),
                ..Default::default()
            },
            instructions: Some(branding::INSTRUCTIONS.to_string()),
        }
    }

    async fn initialize(
        &self,
        params: InitializeRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        let negotiated = self.negotiate_protocol_version(&params.protocol_version.to_string());
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %negotiated,
            connection_id = ?self.connection(&context.extensions),
            "Client initializing"
        );

        self.admit(&params)?;

        if context.peer.peer_info().is_none() {
            context.peer.set_peer_info(params);
        }

        let info = self.get_info();
        Ok(InitializeResult {
            protocol_version: negotiated,
            capabilities: info.capabilities,
            server_info: info.server_info,
            instructions: info.instructions,
        })
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        self.touch(self.connection(&context.extensions));
        let tools = self.tools();
        debug!(count = tools.len(), "list_tools");
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let connection = self.connection(&context.extensions);
        self.touch(connection);

        let arguments = params.arguments.map(Value::Object).unwrap_or(Value::Null);
        let mut invocation = ToolInvocation::new(params.name.to_string(), arguments);
        if let Some(id) = connection {
            invocation = invocation.from_connection(id);
        }

        let result = self.state.dispatcher().dispatch(invocation).await;
        self.touch(connection);
        Ok(call_tool_result(&result))
    }

    async fn on_custom_request(
        &self,
        request: CustomRequest,
        context: RequestContext<RoleServer>,
    ) -> Result<CustomResult, McpError> {
        self.touch(self.connection(&context.extensions));

        let snapshot = match request.method.as_str() {
            HEALTH_METHOD => serde_json::to_value(self.state.health()),
            METRICS_METHOD => serde_json::to_value(self.state.metrics()),
            _ => {
                return Err(McpError::new(
                    ErrorCode::METHOD_NOT_FOUND,
                    request.method,
                    None,
                ))
            }
        };
        snapshot
            .map(CustomResult::new)
            .map_err(|e| McpError::internal_error(format!("Failed to serialize snapshot: {}", e), None))
    }
}
