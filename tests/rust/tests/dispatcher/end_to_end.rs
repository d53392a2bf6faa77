use pretty_assertions::assert_eq;
use serde_json::json;

use n8nmcp_core::{ErrorKind, ToolInvocation};
use tests::n8n::workflow;
use tests::{state_for, StubN8n};

#[tokio::test]
async fn test_list_workflows_active_filter() {
    let n8n = StubN8n::start().await;
    n8n.mount_workflows(vec![
        workflow("1", "Inactive", false),
        workflow("2", "Active", true),
    ])
    .await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("list_workflows", json!({"active": true})))
        .await;

    let envelope = result.to_envelope();
    assert_eq!(envelope["success"], json!(true));
    assert_eq!(envelope["data"]["total"], json!(1));
    assert_eq!(envelope["data"]["workflows"][0]["id"], json!("2"));
    assert_eq!(envelope["data"]["workflows"][0]["name"], json!("Active"));
    assert_eq!(envelope["data"]["workflows"][0]["active"], json!(true));

    let metrics = state.metrics();
    assert_eq!(metrics.request_count, 1);
    assert_eq!(metrics.success_count, 1);
    assert_eq!(metrics.failure_count, 0);
}

#[tokio::test]
async fn test_get_workflow_not_found_counts_one_failure() {
    let n8n = StubN8n::start().await;
    n8n.mount_status("/workflows/missing", 404, 1).await;
    let state = state_for(n8n.config());
    let before = state.metrics().failure_count;

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("get_workflow", json!({"workflowId": "missing"})))
        .await;

    let failure = result.error().expect("404 must fail");
    assert_eq!(failure.kind, ErrorKind::UpstreamError);
    assert_eq!(failure.details["statusCode"], json!(404));
    assert_eq!(failure.details["method"], json!("GET"));
    assert_eq!(state.metrics().failure_count, before + 1);
    // 4xx is not retried
    n8n.verify().await;
}

#[tokio::test]
async fn test_get_workflow_returns_body() {
    let n8n = StubN8n::start().await;
    n8n.mount_workflow("wf1", workflow("wf1", "Daily", true)).await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("get_workflow", json!({"workflowId": "wf1"})))
        .await;

    assert_eq!(result.data().unwrap()["name"], json!("Daily"));
}

#[tokio::test]
async fn test_audit_workflow_over_http() {
    let n8n = StubN8n::start().await;
    let mut raw = workflow("wf1", "Daily", false);
    raw["nodes"][0]["parameters"] = json!({"password": "hunter2"});
    n8n.mount_workflow("wf1", raw).await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("audit_workflow", json!({"workflowId": "wf1"})))
        .await;

    let report = result.data().unwrap();
    assert_eq!(report["workflowId"], json!("wf1"));
    assert_eq!(report["summary"]["high"], json!(1));
    assert_eq!(report["summary"]["info"], json!(1));
}
