use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use n8nmcp_core::{ErrorKind, ToolInvocation};
use tests::n8n::workflow;
use tests::{state_for, StubN8n};

#[tokio::test]
async fn test_read_retried_until_attempts_exhausted() {
    let n8n = StubN8n::start().await;
    n8n.mount_status("/workflows/wf1", 500, 3).await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("get_workflow", json!({"workflowId": "wf1"})))
        .await;

    let failure = result.error().unwrap();
    assert_eq!(failure.kind, ErrorKind::UpstreamError);
    assert_eq!(failure.details["statusCode"], json!(500));
    assert_eq!(failure.details["endpoint"], json!("/workflows/wf1"));
    n8n.verify().await;
}

#[tokio::test]
async fn test_read_recovers_on_second_attempt() {
    let n8n = StubN8n::start().await;
    Mock::given(method("GET"))
        .and(path(StubN8n::api_path("/workflows/wf1")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&n8n.server)
        .await;
    n8n.mount_workflow("wf1", workflow("wf1", "Flaky", true)).await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("get_workflow", json!({"workflowId": "wf1"})))
        .await;

    assert!(result.is_success(), "{:?}", result);
    assert_eq!(result.data().unwrap()["name"], json!("Flaky"));
    assert_eq!(n8n.received().await, 2);
}

#[tokio::test]
async fn test_mutation_is_never_retried() {
    let n8n = StubN8n::start().await;
    Mock::given(method("DELETE"))
        .and(path(StubN8n::api_path("/workflows/wf1")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(1)
        .mount(&n8n.server)
        .await;
    let state = state_for(n8n.config());

    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("delete_workflow", json!({"workflowId": "wf1"})))
        .await;

    let failure = result.error().unwrap();
    assert_eq!(failure.kind, ErrorKind::UpstreamError);
    assert_eq!(failure.details["method"], json!("DELETE"));
    assert!(failure.message.contains("boom"), "{}", failure.message);
    n8n.verify().await;
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let n8n = StubN8n::start().await;
    Mock::given(method("GET"))
        .and(path(StubN8n::api_path("/workflows/slow")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(workflow("slow", "Slow", true))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&n8n.server)
        .await;
    let mut config = n8n.config().with_retry(1, Duration::ZERO);
    config.call_policy.timeout = Duration::from_millis(100);
    let state = state_for(config);

    let started = std::time::Instant::now();
    let result = state
        .dispatcher()
        .dispatch(ToolInvocation::new("get_workflow", json!({"workflowId": "slow"})))
        .await;

    let failure = result.error().unwrap();
    assert_eq!(failure.kind, ErrorKind::TimeoutError);
    assert_eq!(failure.details["timeoutMs"], json!(100));
    assert!(started.elapsed() < Duration::from_millis(450));
    assert_eq!(state.metrics().failure_count, 1);
}
