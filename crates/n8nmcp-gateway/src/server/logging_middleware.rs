//! HTTP request logging
//!
//! Wraps every request in a span keyed by a short trace id and logs one line
//! on completion. Request bodies of `/mcp` POSTs are buffered to name the
//! JSON-RPC method; responses are passed through untouched since `/mcp`
//! answers with SSE streams.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn, Instrument};

use crate::logging::{JsonRpcSummary, RequestTrace, MAX_RPC_BODY_BYTES};

/// Never logged in clear
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-n8n-api-key"];

/// Headers worth seeing when debugging a protocol client
const LOGGED_HEADERS: &[&str] = &[
    "accept",
    "content-type",
    "user-agent",
    "mcp-session-id",
    "mcp-protocol-version",
    "authorization",
    "x-n8n-api-key",
];

fn describe_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| LOGGED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| {
            if SENSITIVE_HEADERS.contains(&name.as_str()) {
                format!("{}=<redacted>", name)
            } else {
                format!("{}={}", name, value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn http_logging_middleware(request: Request, next: Next) -> Response {
    let trace = RequestTrace::from_request(&request);
    let span = trace.span();

    async move {
        let (mut request, trace) = if trace.is_mcp() && request.method() == Method::POST {
            let (parts, body) = request.into_parts();
            let bytes = match to_bytes(body, MAX_RPC_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Rejected request body: {}", e);
                    return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
                }
            };
            let trace = trace.with_rpc(JsonRpcSummary::parse(&bytes));
            (Request::from_parts(parts, Body::from(bytes)), trace)
        } else {
            (request, trace)
        };
        request.extensions_mut().insert(trace.clone());

        if trace.is_mcp() {
            debug!(headers = %describe_headers(request.headers()), "MCP request");
        }

        let response = next.run(request).await;
        trace.log_exit(response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}
