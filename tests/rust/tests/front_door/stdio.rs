use std::sync::Arc;
use std::time::Duration;

use rmcp::service::ClientInitializeError;
use rmcp::ServiceExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use n8nmcp_gateway::mcp::handler::CONNECTION_REJECTED;
use n8nmcp_gateway::{serve_session, ServerState, SessionEnd};
use tests::n8n::workflow;
use tests::{state_for, wait_until, StubN8n};

use super::{call, client_info};

#[tokio::test(flavor = "multi_thread")]
async fn test_stdio_session_lists_and_calls_tools() {
    let n8n = StubN8n::start().await;
    n8n.mount_workflows(vec![workflow("1", "Nightly", true)]).await;
    let state = state_for(n8n.config());

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let session = tokio::spawn(serve_session(
        state.clone(),
        tokio::io::split(server_io),
        CancellationToken::new(),
    ));

    let client = client_info("stdio-test")
        .serve(tokio::io::split(client_io))
        .await
        .expect("client should connect");

    assert!(wait_until(Duration::from_secs(5), || state.pool().active_count() == 1).await);
    let info = &state.pool().connections()[0];
    assert_eq!(info.client.name.as_deref(), Some("stdio-test"));

    let tools = client.list_tools(Default::default()).await.unwrap();
    assert_eq!(tools.tools.len(), 20);
    assert!(tools.tools.iter().any(|t| t.name == "audit_workflow"));

    let result = client
        .call_tool(call("list_workflows", json!({})))
        .await
        .unwrap();
    assert_eq!(result.is_error, Some(false));
    let envelope = result.structured_content.unwrap();
    assert_eq!(envelope["success"], json!(true));
    assert_eq!(envelope["data"]["total"], json!(1));

    client.cancel().await.ok();
    let end = tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session should end after client closes")
        .unwrap()
        .unwrap();
    assert_eq!(end, SessionEnd::Closed);
    assert_eq!(state.pool().active_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stdio_session_ends_on_shutdown() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());
    let cancel = CancellationToken::new();

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let session = tokio::spawn(serve_session(
        state.clone(),
        tokio::io::split(server_io),
        cancel.clone(),
    ));
    let client = client_info("stdio-test")
        .serve(tokio::io::split(client_io))
        .await
        .expect("client should connect");
    assert!(wait_until(Duration::from_secs(5), || state.pool().active_count() == 1).await);

    state.pool().shutdown().await;

    let end = tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session should end after shutdown")
        .unwrap()
        .unwrap();
    assert_eq!(end, SessionEnd::Cancelled);
    assert_eq!(state.pool().active_count(), 0);
    client.cancel().await.ok();
}

/// Second duplex session against `state`; returns the client's handshake
/// outcome and the server-side session result
async fn refused_session(
    state: Arc<ServerState>,
    name: &str,
) -> (rmcp::model::ErrorData, SessionEnd) {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let session = tokio::spawn(serve_session(
        state,
        tokio::io::split(server_io),
        CancellationToken::new(),
    ));

    let outcome = client_info(name).serve(tokio::io::split(client_io)).await;
    let error = match outcome {
        Err(ClientInitializeError::JsonRpcError(error)) => error,
        Err(other) => panic!("expected a JSON-RPC error, got {other}"),
        Ok(_) => panic!("handshake should have been refused"),
    };
    let end = tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("refused session should end")
        .unwrap()
        .unwrap();
    (error, end)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stdio_client_sees_pool_exhausted() {
    let n8n = StubN8n::start().await;
    let mut config = n8n.config();
    config.pool.max_connections = 1;
    let state = state_for(config);

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let first_session = tokio::spawn(serve_session(
        state.clone(),
        tokio::io::split(server_io),
        CancellationToken::new(),
    ));
    let first = client_info("first")
        .serve(tokio::io::split(client_io))
        .await
        .expect("first client should connect");
    assert_eq!(state.pool().active_count(), 1);

    let (error, end) = refused_session(state.clone(), "second").await;
    assert_eq!(error.code, CONNECTION_REJECTED);
    let data = error.data.expect("rejection carries data");
    assert_eq!(data["kind"], json!("PoolExhaustedError"));
    assert_eq!(data["details"]["maxConnections"], json!(1));
    assert_eq!(end, SessionEnd::Rejected);

    assert_eq!(state.pool().active_count(), 1);
    assert_eq!(state.pool().total_accepted(), 1);
    assert_eq!(state.pool().connections()[0].client.name.as_deref(), Some("first"));

    first.cancel().await.ok();
    tokio::time::timeout(Duration::from_secs(5), first_session)
        .await
        .expect("first session should end")
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stdio_client_sees_shutdown() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());
    state.pool().shutdown().await;

    let (error, end) = refused_session(state.clone(), "late").await;
    assert_eq!(error.data.unwrap()["kind"], json!("ShutdownError"));
    assert_eq!(end, SessionEnd::Rejected);
    assert_eq!(state.pool().total_accepted(), 0);
}
