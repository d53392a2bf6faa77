use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use n8nmcp_core::n8n::API_KEY_HEADER;
use n8nmcp_core::{ErrorKind, N8nApi, N8nClient, N8nConfig};
use tests::{StubN8n, TEST_API_KEY};

fn client(n8n: &StubN8n, api_key: &str) -> N8nClient {
    N8nClient::new(&N8nConfig {
        base_url: n8n.uri(),
        api_key: api_key.to_string(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_connectivity_check_sends_api_key() {
    let n8n = StubN8n::start().await;
    Mock::given(method("GET"))
        .and(path(StubN8n::api_path("/workflows")))
        .and(query_param("limit", "1"))
        .and(header(API_KEY_HEADER, TEST_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "nextCursor": null})))
        .expect(1)
        .mount(&n8n.server)
        .await;

    client(&n8n, TEST_API_KEY).check_connectivity().await.unwrap();
    n8n.verify().await;
}

#[tokio::test]
async fn test_connectivity_check_rejects_bad_key() {
    let n8n = StubN8n::start().await;
    Mock::given(method("GET"))
        .and(path(StubN8n::api_path("/workflows")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "unauthorized"})))
        .mount(&n8n.server)
        .await;

    let err = client(&n8n, "wrong").check_connectivity().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamError);
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn test_unreachable_upstream_is_upstream_error() {
    let client = N8nClient::new(&N8nConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        api_key: TEST_API_KEY.to_string(),
    })
    .unwrap();

    let err = client.check_connectivity().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamError);
    assert_eq!(err.status_code(), None);
}
