//! Session admission for the streamable HTTP front door
//!
//! Sits in front of rmcp's `StreamableHttpService`:
//! - `initialize` POSTs are handshake-checked and admitted into the pool
//!   before rmcp sees them; the session id rmcp issues is bound to the
//!   connection id
//! - requests carrying a session id are mapped back to their connection,
//!   which gets its activity touched
//! - `DELETE /mcp` removes the connection
//!
//! The connection id travels to the handler in [`CONNECTION_ID_HEADER`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use rmcp::transport::streamable_http_server::session::{local::LocalSessionManager, SessionManager};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use n8nmcp_core::{ClientDescriptor, ConnectionId, GatewayError, GatewayResult, TransportKind};

use crate::logging::{JsonRpcSummary, RequestTrace, MAX_RPC_BODY_BYTES};
use crate::mcp::{CONNECTION_ID_HEADER, SESSION_ID_HEADER};
use crate::pool::{Connection, TransportHandle};
use crate::state::ServerState;

pub const HANDSHAKE_ERROR: &str = "HandshakeError";
pub const UNKNOWN_SESSION: &str = "UnknownSession";

/// Session id -> pooled connection
pub struct SessionRegistry {
    sessions: DashMap<String, ConnectionId>,
    manager: Arc<LocalSessionManager>,
}

impl SessionRegistry {
    pub fn new(manager: Arc<LocalSessionManager>) -> Self {
        Self {
            sessions: DashMap::new(),
            manager,
        }
    }

    pub fn lookup(&self, session_id: &str) -> Option<ConnectionId> {
        self.sessions.get(session_id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn bind(&self, session_id: String, connection_id: ConnectionId) {
        self.sessions.insert(session_id, connection_id);
    }

    /// Returns whether the session was still bound
    fn forget(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Forget and close a session; false if it was already forgotten
    async fn close(&self, session_id: &str) -> bool {
        if !self.forget(session_id) {
            return false;
        }
        if let Err(e) = self.manager.close_session(&session_id.into()).await {
            debug!(session_id = %session_id, error = %e, "Session already closed");
        }
        true
    }
}

/// Closes the rmcp session of an evicted HTTP connection.
///
/// The session id is filled in once rmcp answers the `initialize` request.
/// A session already forgotten (client sent DELETE) is not closed twice.
struct HttpSessionHandle {
    session_id: Arc<Mutex<Option<String>>>,
    registry: Arc<SessionRegistry>,
}

#[async_trait]
impl TransportHandle for HttpSessionHandle {
    async fn close(&self) -> GatewayResult<()> {
        let Some(session_id) = self.session_id.lock().take() else {
            return Ok(());
        };
        self.registry.close(&session_id).await;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SessionLayerState {
    pub server: Arc<ServerState>,
    pub registry: Arc<SessionRegistry>,
}

fn error_response(status: StatusCode, kind: &str, message: impl Into<String>, details: Value) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "kind": kind,
                "message": message.into(),
                "details": details,
            }
        })),
    )
        .into_response()
}

fn rejection_response(err: &GatewayError, retry_after_secs: u64) -> Response {
    let mut response = error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        err.kind().as_str(),
        err.to_string(),
        err.details(),
    );
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

/// `initialize` must accept both JSON and SSE and send JSON
pub fn check_handshake(headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !(accept.contains("application/json") && accept.contains("text/event-stream")) {
        return Err((
            StatusCode::NOT_ACCEPTABLE,
            "Accept must include application/json and text/event-stream".to_string(),
        ));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json".to_string(),
        ));
    }
    Ok(())
}

/// Client descriptor from `initialize` params; advisory, so missing fields
/// are tolerated
pub fn client_descriptor(body: &Value) -> ClientDescriptor {
    let params = &body["params"];
    let mut client: ClientDescriptor =
        serde_json::from_value(params["clientInfo"].clone()).unwrap_or_default();
    if let Some(version) = params["protocolVersion"].as_str() {
        client = client.with_protocol_version(version);
    }
    client
}

/// Bind an issued session to its connection. If the pool dropped the
/// connection while rmcp was answering, the session is closed instead and
/// `false` is returned.
async fn bind_session(
    state: &SessionLayerState,
    connection_id: ConnectionId,
    slot: &Mutex<Option<String>>,
    session_id: String,
) -> bool {
    state.registry.bind(session_id.clone(), connection_id);
    *slot.lock() = Some(session_id);
    if state.server.pool().contains(connection_id) {
        return true;
    }
    // whoever takes the slot closes the session
    let orphan = slot.lock().take();
    if let Some(session_id) = orphan {
        state.registry.close(&session_id).await;
    }
    false
}

fn set_connection_header(request: &mut Request<Body>, id: ConnectionId) {
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        request.headers_mut().insert(CONNECTION_ID_HEADER, value);
    }
}

pub async fn mcp_session_middleware(
    State(state): State<SessionLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let trace_id = request
        .extensions()
        .get::<RequestTrace>()
        .map(|trace| trace.trace_id.clone())
        .unwrap_or_else(|| "??????".to_string());

    // Never trust a client-supplied connection id
    request.headers_mut().remove(CONNECTION_ID_HEADER);

    let session_id = request
        .headers()
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(session_id) = session_id {
        let Some(connection_id) = state.registry.lookup(&session_id) else {
            warn!(trace_id = %trace_id, session_id = %session_id, "Unknown session");
            return error_response(
                StatusCode::NOT_FOUND,
                UNKNOWN_SESSION,
                format!("Unknown session: {}", session_id),
                json!({ "sessionId": session_id }),
            );
        };

        set_connection_header(&mut request, connection_id);
        if request.method() == Method::DELETE {
            let response = next.run(request).await;
            state.registry.forget(&session_id);
            state.server.pool().remove_connection(connection_id).await;
            info!(trace_id = %trace_id, connection_id = %connection_id, "Session closed by client");
            return response;
        }

        let pool = state.server.pool();
        pool.touch_activity(connection_id);
        let method = request.method().clone();
        let response = next.run(request).await;
        if response.status().is_server_error() {
            pool.record_error(connection_id, format!("{} /mcp answered {}", method, response.status()));
        }
        return response;
    }

    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let body_bytes = match to_bytes(body, MAX_RPC_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(trace_id = %trace_id, "Failed to read body: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Failed to read request body: {}", e)).into_response();
        }
    };

    let is_initialize = JsonRpcSummary::parse(&body_bytes).is_some_and(|rpc| rpc.is_initialize());
    if !is_initialize {
        // rmcp answers session-less non-initialize requests itself
        return next.run(Request::from_parts(parts, Body::from(body_bytes))).await;
    }

    if let Err((status, message)) = check_handshake(&parts.headers) {
        warn!(trace_id = %trace_id, status = %status, "Handshake rejected: {}", message);
        return error_response(status, HANDSHAKE_ERROR, message, json!({}));
    }

    let client = serde_json::from_slice::<Value>(&body_bytes)
        .map(|body| client_descriptor(&body))
        .unwrap_or_default();

    let session_slot = Arc::new(Mutex::new(None));
    let conn = Connection::new(
        TransportKind::Http,
        client,
        Box::new(HttpSessionHandle {
            session_id: session_slot.clone(),
            registry: state.registry.clone(),
        }),
    );

    let pool = state.server.pool();
    let connection_id = match pool.add_connection(conn) {
        Ok(id) => id,
        Err(e) => {
            warn!(trace_id = %trace_id, kind = %e.kind(), "Connection rejected: {}", e);
            return rejection_response(&e, pool.sweep_interval().as_secs().max(1));
        }
    };

    let mut request = Request::from_parts(parts, Body::from(body_bytes));
    set_connection_header(&mut request, connection_id);
    let response = next.run(request).await;

    let issued = response
        .headers()
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match issued {
        Some(session_id) => {
            if bind_session(&state, connection_id, &session_slot, session_id.clone()).await {
                info!(
                    trace_id = %trace_id,
                    connection_id = %connection_id,
                    session_id = %session_id,
                    "Session established"
                );
            } else {
                warn!(
                    trace_id = %trace_id,
                    connection_id = %connection_id,
                    session_id = %session_id,
                    "Connection left the pool before its session was bound, session closed"
                );
            }
        }
        None => {
            debug!(
                trace_id = %trace_id,
                connection_id = %connection_id,
                status = %response.status(),
                "No session issued, rolling back connection"
            );
            pool.remove_connection(connection_id).await;
        }
    }

    response
}
