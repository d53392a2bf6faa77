use std::sync::Arc;
use std::time::Duration;

use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use n8nmcp_gateway::{HttpServer, ServerState};
use tests::{state_for, wait_until, StubN8n};

use super::{call, client_info};

/// Serve on an ephemeral port; returns the base URL
async fn start_server(state: Arc<ServerState>, cancel: CancellationToken) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(state, cancel);
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://{}", addr)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_session_is_pooled_and_counted() {
    let n8n = StubN8n::start().await;
    n8n.mount_status("/workflows/missing", 404, 1).await;
    let state = state_for(n8n.config());
    let cancel = CancellationToken::new();
    let base = start_server(state.clone(), cancel.clone()).await;

    let transport = StreamableHttpClientTransport::from_uri(format!("{}/mcp", base));
    let client = client_info("http-test")
        .serve(transport)
        .await
        .expect("client should connect");
    assert!(wait_until(Duration::from_secs(5), || state.pool().active_count() == 1).await);

    let tools = client.list_tools(Default::default()).await.unwrap();
    assert_eq!(tools.tools.len(), 20);

    let result = client
        .call_tool(call("get_workflow", json!({"workflowId": "missing"})))
        .await
        .unwrap();
    assert_eq!(result.is_error, Some(true));
    let envelope = result.structured_content.unwrap();
    assert_eq!(envelope["error"]["kind"], json!("UpstreamError"));

    let metrics: Value = reqwest::get(format!("{}/metrics", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["failureCount"], json!(1));
    assert_eq!(metrics["activeConnections"], json!(1));

    client.cancel().await.ok();
    n8n.verify().await;
    cancel.cancel();
}

fn initialize_body() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "curl", "version": "8"}
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_session_releases_connection() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());
    let cancel = CancellationToken::new();
    let base = start_server(state.clone(), cancel.clone()).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/mcp", base))
        .header("accept", "application/json, text/event-stream")
        .json(&initialize_body())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "{}", response.status());
    let session_id = response
        .headers()
        .get("mcp-session-id")
        .expect("session id issued")
        .to_str()
        .unwrap()
        .to_string();
    drop(response);
    assert_eq!(state.pool().active_count(), 1);
    assert_eq!(state.pool().connections()[0].client.name.as_deref(), Some("curl"));

    http.delete(format!("{}/mcp", base))
        .header("mcp-session-id", &session_id)
        .send()
        .await
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || state.pool().active_count() == 0).await);

    let stale = http
        .delete(format!("{}/mcp", base))
        .header("mcp-session-id", &session_id)
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), 404);
    cancel.cancel();
}

/// Raw `initialize` POST; returns the response
async fn raw_initialize(http: &reqwest::Client, base: &str) -> reqwest::Response {
    http.post(format!("{}/mcp", base))
        .header("accept", "application/json, text/event-stream")
        .json(&initialize_body())
        .send()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capacity_rejects_then_admits_after_delete() {
    let n8n = StubN8n::start().await;
    let mut config = n8n.config();
    config.pool.max_connections = 1;
    let state = state_for(config);
    let cancel = CancellationToken::new();
    let base = start_server(state.clone(), cancel.clone()).await;
    let http = reqwest::Client::new();

    let first = raw_initialize(&http, &base).await;
    assert!(first.status().is_success(), "{}", first.status());
    let first_session = first
        .headers()
        .get("mcp-session-id")
        .expect("session id issued")
        .to_str()
        .unwrap()
        .to_string();
    drop(first);
    assert_eq!(state.pool().active_count(), 1);

    let refused = raw_initialize(&http, &base).await;
    assert_eq!(refused.status(), 503);
    let retry_after = state.pool().sweep_interval().as_secs().max(1).to_string();
    assert_eq!(
        refused.headers().get("retry-after").and_then(|v| v.to_str().ok()),
        Some(retry_after.as_str())
    );
    assert!(refused.headers().get("mcp-session-id").is_none());
    let body: Value = refused.json().await.unwrap();
    assert_eq!(body["error"]["kind"], json!("PoolExhaustedError"));
    assert_eq!(body["error"]["details"]["maxConnections"], json!(1));

    let rmcp_refused = client_info("second")
        .serve(StreamableHttpClientTransport::from_uri(format!("{}/mcp", base)))
        .await;
    assert!(rmcp_refused.is_err());
    assert_eq!(state.pool().active_count(), 1);
    assert_eq!(state.pool().total_accepted(), 1);

    let closed = http
        .delete(format!("{}/mcp", base))
        .header("mcp-session-id", &first_session)
        .send()
        .await
        .unwrap();
    assert!(closed.status().is_success(), "{}", closed.status());
    assert!(wait_until(Duration::from_secs(5), || state.pool().active_count() == 0).await);

    let third = client_info("third")
        .serve(StreamableHttpClientTransport::from_uri(format!("{}/mcp", base)))
        .await
        .expect("freed slot should admit a new client");
    let tools = third.list_tools(Default::default()).await.unwrap();
    assert_eq!(tools.tools.len(), 20);
    assert_eq!(state.pool().active_count(), 1);
    assert_eq!(state.pool().total_accepted(), 2);
    assert_eq!(state.pool().connections()[0].client.name.as_deref(), Some("third"));

    third.cancel().await.ok();
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initialize_without_sse_accept_is_refused() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());
    let cancel = CancellationToken::new();
    let base = start_server(state.clone(), cancel.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/mcp", base))
        .header("content-type", "application/json")
        .header("accept", "application/json")
        .json(&initialize_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 406);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["kind"], json!("HandshakeError"));
    assert_eq!(state.pool().total_accepted(), 0);
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_reports_draining_after_shutdown() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());
    let cancel = CancellationToken::new();
    let base = start_server(state.clone(), cancel.clone()).await;

    let before: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
    assert_eq!(before["status"], json!("healthy"));

    state.pool().shutdown().await;
    let after: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
    assert_eq!(after["status"], json!("draining"));
    cancel.cancel();
}
