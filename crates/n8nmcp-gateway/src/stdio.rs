//! stdio front door
//!
//! One session per process. The session joins the pool while rmcp answers
//! its `initialize`, so a refused client gets a JSON-RPC error instead of a
//! handshake. Pool eviction cancels the session and EOF on stdin removes the
//! connection.

use std::sync::Arc;

use rmcp::{
    service::{QuitReason, ServerInitializeError},
    transport::IntoTransport,
    RoleServer, ServiceExt,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use n8nmcp_core::ConnectionId;

use crate::mcp::N8nMcpHandler;
use crate::state::ServerState;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed the stream
    Closed,
    /// Evicted by the pool or cancelled by shutdown
    Cancelled,
    /// The pool refused the connection
    Rejected,
}

/// Serve MCP on the process's stdin/stdout
pub async fn run_stdio(state: Arc<ServerState>, cancel: CancellationToken) -> anyhow::Result<SessionEnd> {
    info!("[stdio] Serving MCP on stdin/stdout");
    serve_session(state, rmcp::transport::stdio(), cancel).await
}

/// Serve one MCP session over any rmcp transport
pub async fn serve_session<T, E, A>(
    state: Arc<ServerState>,
    transport: T,
    cancel: CancellationToken,
) -> anyhow::Result<SessionEnd>
where
    T: IntoTransport<RoleServer, E, A>,
    E: std::error::Error + Send + Sync + 'static,
{
    let id = ConnectionId::new();
    let session_cancel = cancel.child_token();
    let handler = N8nMcpHandler::for_stdio(state.clone(), id, session_cancel.clone());

    let running = match handler.serve_with_ct(transport, session_cancel).await {
        Ok(running) => running,
        Err(ServerInitializeError::InitializeFailed(e)) => {
            error!(connection_id = %id, "[stdio] Session refused: {}", e.message);
            return Ok(SessionEnd::Rejected);
        }
        Err(e) => {
            state.pool().remove_connection(id).await;
            return Err(e.into());
        }
    };

    let quit = running.waiting().await;
    state.pool().remove_connection(id).await;

    let end = match quit {
        Ok(QuitReason::Cancelled) => SessionEnd::Cancelled,
        Ok(reason) => {
            info!(connection_id = %id, ?reason, "[stdio] Session ended");
            SessionEnd::Closed
        }
        Err(join) => {
            warn!(connection_id = %id, "[stdio] Session task failed: {}", join);
            SessionEnd::Closed
        }
    };
    Ok(end)
}
