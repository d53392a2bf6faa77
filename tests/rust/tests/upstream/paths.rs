use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

use n8nmcp_core::n8n::N8nApi;
use n8nmcp_core::{ErrorKind, N8nClient, ToolInvocation};
use tests::{state_for, StubN8n};

#[tokio::test]
async fn test_unsafe_ids_rejected_before_upstream() {
    let n8n = StubN8n::start().await;
    let state = state_for(n8n.config());

    for id in ["x/../../credentials", "1?limit=999", "a#b"] {
        let result = state
            .dispatcher()
            .dispatch(ToolInvocation::new("delete_workflow", json!({"workflowId": id})))
            .await;
        let failure = result.error().unwrap();
        assert_eq!(failure.kind, ErrorKind::ValidationError, "{id}");
        assert_eq!(failure.details["fields"], json!(["workflowId"]));
    }
    assert_eq!(n8n.received().await, 0);
}

#[tokio::test]
async fn test_client_keeps_id_inside_one_segment() {
    let n8n = StubN8n::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&n8n.server)
        .await;
    let client = N8nClient::new(&n8n.config().n8n).unwrap();

    client.delete_workflow("x/../../credentials").await.unwrap();
    client.delete_workflow("1?limit=999").await.unwrap();

    let requests = n8n.server.received_requests().await.unwrap();
    let seen: Vec<(String, Option<String>)> = requests
        .iter()
        .map(|r| (r.url.path().to_string(), r.url.query().map(str::to_string)))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("/api/v1/workflows/x%2F..%2F..%2Fcredentials".to_string(), None),
            ("/api/v1/workflows/1%3Flimit=999".to_string(), None),
        ]
    );
}
