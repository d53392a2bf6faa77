//! n8n API client gateway

mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use client::{N8nClient, API_KEY_HEADER};
pub use types::*;

use crate::error::GatewayResult;

/// Operations the tool handlers need from n8n.
///
/// Implemented by [`N8nClient`]; tests substitute their own.
#[async_trait]
pub trait N8nApi: Send + Sync {
    /// Cheap authenticated request used at startup
    async fn check_connectivity(&self) -> GatewayResult<()>;

    async fn list_workflows(&self, query: &WorkflowQuery) -> GatewayResult<Page>;
    async fn get_workflow(&self, id: &str) -> GatewayResult<Value>;
    async fn create_workflow(&self, body: &Value) -> GatewayResult<Value>;
    async fn update_workflow(&self, id: &str, body: &Value) -> GatewayResult<Value>;
    async fn delete_workflow(&self, id: &str) -> GatewayResult<Value>;
    async fn set_workflow_active(&self, id: &str, active: bool) -> GatewayResult<Value>;
    async fn execute_workflow(&self, id: &str, data: Option<&Value>) -> GatewayResult<Value>;

    async fn list_executions(&self, query: &ExecutionQuery) -> GatewayResult<Page>;
    async fn get_execution(&self, id: &str, include_data: bool) -> GatewayResult<Value>;

    async fn list_variables(&self) -> GatewayResult<Page>;
    async fn create_variable(&self, key: &str, value: &str) -> GatewayResult<Value>;

    async fn create_credential(&self, body: &Value) -> GatewayResult<Value>;
}
