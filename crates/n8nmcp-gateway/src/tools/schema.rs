//! JSON schemas advertised in `tools/list`

use serde_json::{json, Map, Value};

use super::ToolKind;

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn workflow_id() -> Value {
    json!({"type": "string", "description": "n8n workflow id"})
}

fn position() -> Value {
    json!({
        "type": "array",
        "items": {"type": "number"},
        "minItems": 2,
        "maxItems": 2,
        "description": "Canvas position [x, y]"
    })
}

fn connection_properties() -> Value {
    json!({
        "workflowId": workflow_id(),
        "sourceNode": {"type": "string", "description": "Name of the node the connection starts at"},
        "targetNode": {"type": "string", "description": "Name of the node the connection ends at"},
        "sourceOutput": {"type": "integer", "minimum": 0, "default": 0},
        "targetInput": {"type": "integer", "minimum": 0, "default": 0},
        "connectionType": {"type": "string", "default": "main"}
    })
}

/// Input schema for a tool
pub fn input_schema(kind: ToolKind) -> Map<String, Value> {
    let schema = match kind {
        ToolKind::ListWorkflows => object(
            json!({
                "active": {"type": "boolean", "description": "Only return active (true) or inactive (false) workflows"},
                "tags": {
                    "oneOf": [
                        {"type": "string"},
                        {"type": "array", "items": {"type": "string"}}
                    ],
                    "description": "Tag names, comma separated or as a list"
                },
                "name": {"type": "string", "description": "Exact workflow name"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 250},
                "cursor": {"type": "string", "description": "Pagination cursor from a previous call"}
            }),
            &[],
        ),
        ToolKind::GetWorkflow
        | ToolKind::DeleteWorkflow
        | ToolKind::ActivateWorkflow
        | ToolKind::DeactivateWorkflow
        | ToolKind::AuditWorkflow => object(json!({ "workflowId": workflow_id() }), &["workflowId"]),
        ToolKind::CreateWorkflow => object(
            json!({
                "name": {"type": "string"},
                "nodes": {"type": "array", "items": {"type": "object"}},
                "connections": {"type": "object"},
                "settings": {"type": "object"}
            }),
            &["name"],
        ),
        ToolKind::UpdateWorkflow => object(
            json!({
                "workflowId": workflow_id(),
                "name": {"type": "string"},
                "nodes": {"type": "array", "items": {"type": "object"}},
                "connections": {"type": "object"},
                "settings": {"type": "object"}
            }),
            &["workflowId"],
        ),
        ToolKind::ExecuteWorkflow => object(
            json!({
                "workflowId": workflow_id(),
                "data": {"type": "object", "description": "Input data passed to the workflow"}
            }),
            &["workflowId"],
        ),
        ToolKind::AddNode => object(
            json!({
                "workflowId": workflow_id(),
                "node": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "type": {"type": "string", "description": "Node type, e.g. n8n-nodes-base.httpRequest"},
                        "position": position(),
                        "parameters": {"type": "object"},
                        "typeVersion": {"type": "number"}
                    },
                    "required": ["name", "type"]
                }
            }),
            &["workflowId", "node"],
        ),
        ToolKind::UpdateNode => object(
            json!({
                "workflowId": workflow_id(),
                "nodeName": {"type": "string"},
                "parameters": {"type": "object", "description": "Merged into the node's existing parameters"},
                "position": position(),
                "newName": {"type": "string"}
            }),
            &["workflowId", "nodeName"],
        ),
        ToolKind::RemoveNode => object(
            json!({
                "workflowId": workflow_id(),
                "nodeName": {"type": "string"}
            }),
            &["workflowId", "nodeName"],
        ),
        ToolKind::AddConnection | ToolKind::RemoveConnection => object(
            connection_properties(),
            &["workflowId", "sourceNode", "targetNode"],
        ),
        ToolKind::ListExecutions => object(
            json!({
                "workflowId": workflow_id(),
                "status": {"type": "string", "enum": ["error", "success", "waiting"]},
                "limit": {"type": "integer", "minimum": 1, "maximum": 250},
                "includeData": {"type": "boolean"},
                "cursor": {"type": "string"}
            }),
            &[],
        ),
        ToolKind::GetExecution => object(
            json!({
                "executionId": {"type": "string"},
                "includeData": {"type": "boolean", "default": false}
            }),
            &["executionId"],
        ),
        ToolKind::ListVariables => object(json!({}), &[]),
        ToolKind::CreateVariable => object(
            json!({
                "key": {"type": "string", "pattern": "^[A-Za-z0-9_]+$"},
                "value": {"type": "string"}
            }),
            &["key", "value"],
        ),
        ToolKind::CreateCredential => object(
            json!({
                "name": {"type": "string"},
                "type": {"type": "string", "description": "Credential type, e.g. httpBasicAuth"},
                "data": {"type": "object", "description": "Credential fields; never echoed back"}
            }),
            &["name", "type", "data"],
        ),
        ToolKind::ValidateWorkflow => json!({
            "type": "object",
            "properties": {
                "workflowId": workflow_id(),
                "workflow": {"type": "object", "description": "Inline workflow JSON with nodes and connections"}
            },
            "oneOf": [
                {"required": ["workflowId"]},
                {"required": ["workflow"]}
            ]
        }),
    };

    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
