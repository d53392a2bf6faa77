//! reqwest-backed n8n REST client
//!
//! All transport and decoding failures are mapped to
//! [`GatewayError::Upstream`] here and nowhere else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use super::types::{ExecutionQuery, Page, WorkflowQuery};
use super::N8nApi;
use crate::config::N8nConfig;
use crate::error::{GatewayError, GatewayResult};

pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";
const API_PREFIX: &str = "/api/v1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the n8n public REST API
#[derive(Clone)]
pub struct N8nClient {
    base_url: Url,
    client: reqwest::Client,
}

impl N8nClient {
    pub fn new(config: &N8nConfig) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| GatewayError::initialization("N8N_API_KEY contains invalid header characters"))?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("n8nmcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::initialization(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&api_base(&config.base_url))
            .map_err(|e| GatewayError::initialization(format!("Invalid n8n base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::initialization(format!(
                "n8n base URL {} cannot carry a path",
                base_url
            )));
        }

        Ok(Self { base_url, client })
    }

    /// Base URL including the `/api/v1` prefix
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append `segments` to the base URL, each percent-encoded as a single segment
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> GatewayResult<Value> {
        let url = self.url_for(segments);
        let endpoint = format!("/{}", segments.join("/"));
        debug!(method = %method, endpoint = %endpoint, "n8n request");

        let mut request = self.client.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let upstream = |status: Option<u16>, body: Option<String>, message: String| GatewayError::Upstream {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status,
            body,
            message,
        };

        let response = request
            .send()
            .await
            .map_err(|e| upstream(None, None, format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| upstream(Some(status.as_u16()), None, format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            });
            return Err(upstream(Some(status.as_u16()), Some(text), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            upstream(
                Some(status.as_u16()),
                Some(text.clone()),
                format!("invalid JSON in response: {}", e),
            )
        })
    }

    async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> GatewayResult<Value> {
        self.request(Method::GET, segments, query, None).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> GatewayResult<Value> {
        self.request(Method::POST, segments, &[], Some(body)).await
    }

    async fn get_page(&self, segments: &[&str], query: &[(&str, String)]) -> GatewayResult<Page> {
        let value = self.get(segments, query).await?;
        serde_json::from_value(value.clone()).map_err(|e| GatewayError::Upstream {
            method: "GET".to_string(),
            endpoint: format!("/{}", segments.join("/")),
            status: None,
            body: Some(value.to_string()),
            message: format!("unexpected list response: {}", e),
        })
    }
}

#[async_trait]
impl N8nApi for N8nClient {
    async fn check_connectivity(&self) -> GatewayResult<()> {
        self.get(&["workflows"], &[("limit", "1".to_string())]).await?;
        info!(base_url = %self.base_url, "Connected to n8n API");
        Ok(())
    }

    async fn list_workflows(&self, query: &WorkflowQuery) -> GatewayResult<Page> {
        self.get_page(&["workflows"], &query.to_pairs()).await
    }

    async fn get_workflow(&self, id: &str) -> GatewayResult<Value> {
        self.get(&["workflows", id], &[]).await
    }

    async fn create_workflow(&self, body: &Value) -> GatewayResult<Value> {
        self.post(&["workflows"], body).await
    }

    async fn update_workflow(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        self.request(Method::PUT, &["workflows", id], &[], Some(body))
            .await
    }

    async fn delete_workflow(&self, id: &str) -> GatewayResult<Value> {
        self.request(Method::DELETE, &["workflows", id], &[], None)
            .await
    }

    async fn set_workflow_active(&self, id: &str, active: bool) -> GatewayResult<Value> {
        let action = if active { "activate" } else { "deactivate" };
        self.post(&["workflows", id, action], &json!({}))
            .await
    }

    async fn execute_workflow(&self, id: &str, data: Option<&Value>) -> GatewayResult<Value> {
        let body = match data {
            Some(data) => json!({ "data": data }),
            None => json!({}),
        };
        self.post(&["workflows", id, "execute"], &body).await
    }

    async fn list_executions(&self, query: &ExecutionQuery) -> GatewayResult<Page> {
        self.get_page(&["executions"], &query.to_pairs()).await
    }

    async fn get_execution(&self, id: &str, include_data: bool) -> GatewayResult<Value> {
        self.get(
            &["executions", id],
            &[("includeData", include_data.to_string())],
        )
        .await
    }

    async fn list_variables(&self) -> GatewayResult<Page> {
        self.get_page(&["variables"], &[]).await
    }

    async fn create_variable(&self, key: &str, value: &str) -> GatewayResult<Value> {
        self.post(&["variables"], &json!({ "key": key, "value": value }))
            .await
    }

    async fn create_credential(&self, body: &Value) -> GatewayResult<Value> {
        self.post(&["credentials"], body).await
    }
}

/// Normalize a configured base URL to `<origin>/api/v1` without a trailing slash
fn api_base(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(API_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_PREFIX)
    }
}

/// n8n error bodies look like `{"message": "..."}`
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
