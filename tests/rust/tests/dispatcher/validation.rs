use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use n8nmcp_core::{ErrorKind, ToolInvocation};
use tests::n8n::workflow;
use tests::{state_for, StubN8n};

#[tokio::test]
async fn test_unknown_tool_never_contacts_upstream() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("format_disk", json!({})))
        .await;

    let failure = result.error().unwrap();
    assert_eq!(failure.kind, ErrorKind::UnknownToolError);
    assert_eq!(failure.message, "Unknown tool: format_disk");
    assert_eq!(n8n.received().await, 0);
}

#[tokio::test]
async fn test_invalid_arguments_name_every_field() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new(
            "add_connection",
            json!({"workflowId": "wf1", "sourceNode": 7}),
        ))
        .await;

    let failure = result.error().unwrap();
    assert_eq!(failure.kind, ErrorKind::ValidationError);
    let fields: Vec<&str> = failure.details["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f.as_str())
        .collect();
    assert!(fields.contains(&"sourceNode"), "{:?}", fields);
    assert!(fields.contains(&"targetNode"), "{:?}", fields);
    assert_eq!(n8n.received().await, 0);

    let metrics = state.metrics();
    assert_eq!(metrics.failure_count, 1);
    assert_eq!(metrics.success_count, 0);
}

#[tokio::test]
async fn test_concurrent_dispatch_counters_balance() {
    let n8n = StubN8n::start().await;
    n8n.mount_workflows(vec![]).await;
    let state = state_for(n8n.config());

    let calls = (0..20).map(|i| {
        let state = state.clone();
        tokio::spawn(async move {
            let tool = if i % 2 == 0 { "list_workflows" } else { "no_such_tool" };
            state
                .dispatcher()
                .dispatch(ToolInvocation::new(tool, json!({})))
                .await
        })
    });
    for call in futures::future::join_all(calls).await {
        call.unwrap();
    }

    let metrics = state.metrics();
    assert_eq!(metrics.request_count, 20);
    assert_eq!(metrics.success_count, 10);
    assert_eq!(metrics.failure_count, 10);
}

#[tokio::test]
async fn test_cancelled_dispatch_still_balances_counters() {
    let n8n = StubN8n::start().await;
    Mock::given(method("GET"))
        .and(path(StubN8n::api_path("/workflows/slow")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(workflow("slow", "Slow", true))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&n8n.server)
        .await;
    let state = state_for(n8n.config());

    // the caller gives up while the upstream request is in flight
    let abandoned = tokio::time::timeout(
        Duration::from_millis(200),
        state
            .dispatcher()
            .dispatch(ToolInvocation::new("get_workflow", json!({"workflowId": "slow"}))),
    )
    .await;
    assert!(abandoned.is_err());

    let metrics = state.metrics();
    assert_eq!(metrics.request_count, 1);
    assert_eq!(metrics.success_count, 0);
    assert_eq!(metrics.failure_count, 1);
}
