//! Tool handlers
//!
//! Each handler is a plain async function over validated arguments and the
//! [`N8nApi`] gateway. Retry and timeout are applied by the dispatcher.

mod analysis;
mod executions;
mod nodes;
mod variables;
mod workflows;

pub use analysis::{audit_report, validation_report};
pub use nodes::{edit_add_connection, edit_add_node, edit_remove_connection, edit_remove_node, edit_update_node};

use serde_json::Value;

use n8nmcp_core::n8n::{N8nApi, Workflow};
use n8nmcp_core::{GatewayError, GatewayResult};

use super::ToolArgs;

/// Run the handler selected by `args`
pub async fn execute(api: &dyn N8nApi, args: &ToolArgs) -> GatewayResult<Value> {
    match args {
        ToolArgs::ListWorkflows(query) => workflows::list(api, query).await,
        ToolArgs::GetWorkflow { workflow_id } => api.get_workflow(workflow_id).await,
        ToolArgs::CreateWorkflow(args) => workflows::create(api, args).await,
        ToolArgs::UpdateWorkflow(args) => workflows::update(api, args).await,
        ToolArgs::DeleteWorkflow { workflow_id } => workflows::delete(api, workflow_id).await,
        ToolArgs::ActivateWorkflow { workflow_id } => api.set_workflow_active(workflow_id, true).await,
        ToolArgs::DeactivateWorkflow { workflow_id } => api.set_workflow_active(workflow_id, false).await,
        ToolArgs::ExecuteWorkflow { workflow_id, data } => {
            api.execute_workflow(workflow_id, data.as_ref()).await
        }
        ToolArgs::AddNode { workflow_id, node } => nodes::add_node(api, workflow_id, node).await,
        ToolArgs::UpdateNode(args) => nodes::update_node(api, args).await,
        ToolArgs::RemoveNode {
            workflow_id,
            node_name,
        } => nodes::remove_node(api, workflow_id, node_name).await,
        ToolArgs::AddConnection(args) => nodes::add_connection(api, args).await,
        ToolArgs::RemoveConnection(args) => nodes::remove_connection(api, args).await,
        ToolArgs::ListExecutions(query) => executions::list(api, query).await,
        ToolArgs::GetExecution {
            execution_id,
            include_data,
        } => api.get_execution(execution_id, *include_data).await,
        ToolArgs::ListVariables => variables::list(api).await,
        ToolArgs::CreateVariable { key, value } => variables::create(api, key, value).await,
        ToolArgs::CreateCredential {
            name,
            credential_type,
            data,
        } => variables::create_credential(api, name, credential_type, data).await,
        ToolArgs::ValidateWorkflow(source) => analysis::validate(api, source).await,
        ToolArgs::AuditWorkflow { workflow_id } => analysis::audit(api, workflow_id).await,
    }
}

/// Fetch a workflow and decode it into the typed model
pub(crate) async fn load_workflow(api: &dyn N8nApi, id: &str) -> GatewayResult<Workflow> {
    let raw = api.get_workflow(id).await?;
    Workflow::from_value(raw.clone()).map_err(|e| GatewayError::Upstream {
        method: "GET".to_string(),
        endpoint: format!("/workflows/{}", id),
        status: None,
        body: Some(raw.to_string()),
        message: format!("unexpected workflow shape: {}", e),
    })
}

/// PUT the edited workflow back
pub(crate) async fn save_workflow(api: &dyn N8nApi, id: &str, workflow: &Workflow) -> GatewayResult<Value> {
    api.update_workflow(id, &workflow.update_payload()).await
}
