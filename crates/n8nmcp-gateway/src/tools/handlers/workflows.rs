//! Workflow CRUD

use serde_json::{json, Map, Value};

use n8nmcp_core::n8n::{Connections, N8nApi, Node, WorkflowQuery, WorkflowSummary};
use n8nmcp_core::{GatewayError, GatewayResult};

use super::{load_workflow, save_workflow};
use crate::tools::args::{CreateWorkflowArgs, UpdateWorkflowArgs};
use crate::tools::ToolKind;

/// List workflows. `active` and `name` are forwarded to n8n and also applied
/// to the returned page, so the result honors them even when the upstream
/// version ignores a filter.
pub async fn list(api: &dyn N8nApi, query: &WorkflowQuery) -> GatewayResult<Value> {
    let page = api.list_workflows(query).await?;

    let name_filter = query.name.as_deref().map(str::to_lowercase);
    let workflows: Vec<WorkflowSummary> = page
        .data
        .iter()
        .map(WorkflowSummary::from_value)
        .filter(|w| query.active.map_or(true, |active| w.active == active))
        .filter(|w| {
            name_filter
                .as_deref()
                .map_or(true, |name| w.name.to_lowercase().contains(name))
        })
        .collect();

    Ok(json!({
        "workflows": workflows,
        "total": workflows.len(),
        "nextCursor": page.next_cursor,
    }))
}

pub async fn create(api: &dyn N8nApi, args: &CreateWorkflowArgs) -> GatewayResult<Value> {
    let body = json!({
        "name": args.name,
        "nodes": args.nodes.clone().unwrap_or_default(),
        "connections": args.connections.clone().unwrap_or_default(),
        "settings": args.settings.clone().unwrap_or_else(default_settings),
    });
    api.create_workflow(&body).await
}

/// Read-modify-write: fields not given keep their current value
pub async fn update(api: &dyn N8nApi, args: &UpdateWorkflowArgs) -> GatewayResult<Value> {
    let tool = ToolKind::UpdateWorkflow.name();

    // decode before fetching so bad input never reaches n8n
    let nodes: Option<Vec<Node>> = args
        .nodes
        .as_ref()
        .map(|nodes| serde_json::from_value(Value::Array(nodes.clone())))
        .transpose()
        .map_err(|e| GatewayError::validation(tool, "nodes", format!("invalid node list: {}", e)))?;
    let connections: Option<Connections> = args
        .connections
        .as_ref()
        .map(|c| serde_json::from_value(Value::Object(c.clone())))
        .transpose()
        .map_err(|e| GatewayError::validation(tool, "connections", format!("invalid connections: {}", e)))?;

    let mut workflow = load_workflow(api, &args.workflow_id).await?;
    if let Some(name) = &args.name {
        workflow.name = name.clone();
    }
    if let Some(nodes) = nodes {
        workflow.nodes = nodes;
    }
    if let Some(connections) = connections {
        workflow.connections = connections;
    }
    if let Some(settings) = &args.settings {
        workflow.settings = Some(Value::Object(settings.clone()));
    }

    save_workflow(api, &args.workflow_id, &workflow).await
}

pub async fn delete(api: &dyn N8nApi, workflow_id: &str) -> GatewayResult<Value> {
    api.delete_workflow(workflow_id).await?;
    Ok(json!({ "deleted": true, "workflowId": workflow_id }))
}

fn default_settings() -> Map<String, Value> {
    let mut settings = Map::new();
    settings.insert("executionOrder".into(), json!("v1"));
    settings
}
