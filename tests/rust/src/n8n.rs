use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use n8nmcp_core::n8n::API_KEY_HEADER;
use n8nmcp_core::GatewayConfig;

use crate::{test_config, TEST_API_KEY};

pub struct StubN8n {
    pub server: MockServer,
}

impl StubN8n {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn config(&self) -> GatewayConfig {
        test_config(&self.uri())
    }

    pub fn api_path(endpoint: &str) -> String {
        format!("/api/v1{}", endpoint)
    }

    /// `GET /workflows` answering one page
    pub async fn mount_workflows(&self, workflows: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(Self::api_path("/workflows")))
            .and(header(API_KEY_HEADER, TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": workflows,
                "nextCursor": null,
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_workflow(&self, id: &str, workflow: Value) {
        Mock::given(method("GET"))
            .and(path(Self::api_path(&format!("/workflows/{}", id))))
            .respond_with(ResponseTemplate::new(200).set_body_json(workflow))
            .mount(&self.server)
            .await;
    }

    /// Every call to `GET endpoint` answers `status`; exactly `expected` calls
    /// must arrive before [`StubN8n::verify`]
    pub async fn mount_status(&self, endpoint: &str, status: u16, expected: u64) {
        Mock::given(method("GET"))
            .and(path(Self::api_path(endpoint)))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"message": "stubbed failure"})),
            )
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn verify(&self) {
        self.server.verify().await;
    }

    pub async fn received(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

pub fn workflow(id: &str, name: &str, active: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "active": active,
        "nodes": [
            {
                "name": "Start",
                "type": "n8n-nodes-base.manualTrigger",
                "typeVersion": 1,
                "position": [250, 300],
                "parameters": {}
            }
        ],
        "connections": {},
        "settings": {"executionOrder": "v1"}
    })
}
