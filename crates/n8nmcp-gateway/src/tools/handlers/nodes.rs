//! Node and connection editing
//!
//! Edits are applied to the typed [`Workflow`] in memory (the `edit_*`
//! functions) and then written back with a single PUT.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use n8nmcp_core::n8n::{ConnectionTarget, N8nApi, Node, Workflow};
use n8nmcp_core::{FieldProblem, GatewayError, GatewayResult};

use super::{load_workflow, save_workflow};
use crate::tools::args::{ConnectionArgs, NewNode, UpdateNodeArgs};
use crate::tools::ToolKind;

/// Horizontal gap used when placing a node without an explicit position
const NODE_SPACING: f64 = 250.0;
const DEFAULT_Y: f64 = 300.0;

pub async fn add_node(api: &dyn N8nApi, workflow_id: &str, node: &NewNode) -> GatewayResult<Value> {
    let mut workflow = load_workflow(api, workflow_id).await?;
    let added = edit_add_node(&mut workflow, node)?;
    save_workflow(api, workflow_id, &workflow).await?;
    Ok(json!({ "workflowId": workflow_id, "node": added }))
}

pub async fn update_node(api: &dyn N8nApi, args: &UpdateNodeArgs) -> GatewayResult<Value> {
    let mut workflow = load_workflow(api, &args.workflow_id).await?;
    let updated = edit_update_node(&mut workflow, args)?;
    save_workflow(api, &args.workflow_id, &workflow).await?;
    Ok(json!({ "workflowId": args.workflow_id, "node": updated }))
}

pub async fn remove_node(api: &dyn N8nApi, workflow_id: &str, node_name: &str) -> GatewayResult<Value> {
    let mut workflow = load_workflow(api, workflow_id).await?;
    let connections_removed = edit_remove_node(&mut workflow, node_name)?;
    save_workflow(api, workflow_id, &workflow).await?;
    Ok(json!({
        "workflowId": workflow_id,
        "removed": node_name,
        "connectionsRemoved": connections_removed,
    }))
}

pub async fn add_connection(api: &dyn N8nApi, args: &ConnectionArgs) -> GatewayResult<Value> {
    let mut workflow = load_workflow(api, &args.workflow_id).await?;
    let created = edit_add_connection(&mut workflow, args)?;
    if created {
        save_workflow(api, &args.workflow_id, &workflow).await?;
    }
    Ok(json!({
        "workflowId": args.workflow_id,
        "sourceNode": args.source_node,
        "targetNode": args.target_node,
        "sourceOutput": args.source_output,
        "targetInput": args.target_input,
        "connectionType": args.connection_type,
        "created": created,
    }))
}

pub async fn remove_connection(api: &dyn N8nApi, args: &ConnectionArgs) -> GatewayResult<Value> {
    let mut workflow = load_workflow(api, &args.workflow_id).await?;
    let removed = edit_remove_connection(&mut workflow, args);
    if removed {
        save_workflow(api, &args.workflow_id, &workflow).await?;
    }
    Ok(json!({ "workflowId": args.workflow_id, "removed": removed }))
}

/// Append a node. Names must be unique within a workflow.
pub fn edit_add_node(workflow: &mut Workflow, new: &NewNode) -> GatewayResult<Node> {
    if workflow.node(&new.name).is_some() {
        return Err(GatewayError::validation(
            ToolKind::AddNode.name(),
            "node.name",
            format!("a node named '{}' already exists", new.name),
        ));
    }

    let position = new.position.unwrap_or_else(|| next_position(workflow));
    let mut extra = Map::new();
    extra.insert("id".into(), Value::String(Uuid::new_v4().to_string()));

    let node = Node {
        name: new.name.clone(),
        node_type: new.node_type.clone(),
        type_version: Some(new.type_version.clone().unwrap_or_else(|| json!(1))),
        position,
        parameters: new.parameters.clone().unwrap_or_default(),
        disabled: None,
        extra,
    };
    workflow.nodes.push(node.clone());
    Ok(node)
}

/// Right of the rightmost node, on its row
fn next_position(workflow: &Workflow) -> [f64; 2] {
    workflow
        .nodes
        .iter()
        .map(|n| n.position)
        .max_by(|a, b| a[0].total_cmp(&b[0]))
        .map(|[x, y]| [x + NODE_SPACING, y])
        .unwrap_or([NODE_SPACING, DEFAULT_Y])
}

/// Merge parameters, move, or rename a node. Renames are carried through
/// every connection that references the node.
pub fn edit_update_node(workflow: &mut Workflow, args: &UpdateNodeArgs) -> GatewayResult<Node> {
    let tool = ToolKind::UpdateNode.name();
    if workflow.node(&args.node_name).is_none() {
        return Err(GatewayError::validation(
            tool,
            "nodeName",
            format!("no node named '{}'", args.node_name),
        ));
    }
    if let Some(new_name) = &args.new_name {
        if new_name != &args.node_name && workflow.node(new_name).is_some() {
            return Err(GatewayError::validation(
                tool,
                "newName",
                format!("a node named '{}' already exists", new_name),
            ));
        }
    }

    if let Some(new_name) = args.new_name.as_ref().filter(|n| *n != &args.node_name) {
        rename_in_connections(workflow, &args.node_name, new_name);
    }

    let Some(node) = workflow.node_mut(&args.node_name) else {
        return Err(GatewayError::validation(tool, "nodeName", "node disappeared during update"));
    };
    if let Some(parameters) = &args.parameters {
        for (key, value) in parameters {
            node.parameters.insert(key.clone(), value.clone());
        }
    }
    if let Some(position) = args.position {
        node.position = position;
    }
    if let Some(new_name) = &args.new_name {
        node.name = new_name.clone();
    }
    Ok(node.clone())
}

fn rename_in_connections(workflow: &mut Workflow, from: &str, to: &str) {
    if let Some(outputs) = workflow.connections.remove(from) {
        workflow.connections.insert(to.to_string(), outputs);
    }
    for target in all_targets_mut(workflow) {
        if target.node == from {
            target.node = to.to_string();
        }
    }
}

fn all_targets_mut(workflow: &mut Workflow) -> impl Iterator<Item = &mut ConnectionTarget> {
    workflow
        .connections
        .values_mut()
        .flat_map(|by_type| by_type.values_mut())
        .flat_map(|slots| slots.iter_mut())
        .flat_map(|targets| targets.iter_mut())
}

/// Remove a node and every connection from or to it. Returns the number of
/// connections dropped.
pub fn edit_remove_node(workflow: &mut Workflow, name: &str) -> GatewayResult<usize> {
    let before = workflow.nodes.len();
    workflow.nodes.retain(|n| n.name != name);
    if workflow.nodes.len() == before {
        return Err(GatewayError::validation(
            ToolKind::RemoveNode.name(),
            "nodeName",
            format!("no node named '{}'", name),
        ));
    }

    let mut removed = workflow
        .connections
        .remove(name)
        .map(|outputs| {
            outputs
                .values()
                .flat_map(|slots| slots.iter())
                .map(Vec::len)
                .sum::<usize>()
        })
        .unwrap_or(0);

    for by_type in workflow.connections.values_mut() {
        for slots in by_type.values_mut() {
            for targets in slots.iter_mut() {
                let len = targets.len();
                targets.retain(|t| t.node != name);
                removed += len - targets.len();
            }
        }
    }
    prune_connections(workflow);
    Ok(removed)
}

/// Add `source[output] -> target[input]`. Returns false when the connection
/// already exists.
pub fn edit_add_connection(workflow: &mut Workflow, args: &ConnectionArgs) -> GatewayResult<bool> {
    let mut problems = Vec::new();
    if workflow.node(&args.source_node).is_none() {
        problems.push(FieldProblem::new(
            "sourceNode",
            format!("no node named '{}'", args.source_node),
        ));
    }
    if workflow.node(&args.target_node).is_none() {
        problems.push(FieldProblem::new(
            "targetNode",
            format!("no node named '{}'", args.target_node),
        ));
    }
    if !problems.is_empty() {
        return Err(GatewayError::Validation {
            tool: ToolKind::AddConnection.name().to_string(),
            problems,
        });
    }

    let slots = workflow
        .connections
        .entry(args.source_node.clone())
        .or_default()
        .entry(args.connection_type.clone())
        .or_default();
    let output = args.source_output as usize;
    if slots.len() <= output {
        slots.resize_with(output + 1, Vec::new);
    }

    let target = ConnectionTarget {
        node: args.target_node.clone(),
        connection_type: args.connection_type.clone(),
        index: args.target_input,
    };
    if slots[output].contains(&target) {
        return Ok(false);
    }
    slots[output].push(target);
    Ok(true)
}

/// Remove `source[output] -> target[input]`. Returns whether anything changed.
pub fn edit_remove_connection(workflow: &mut Workflow, args: &ConnectionArgs) -> bool {
    let Some(slots) = workflow
        .connections
        .get_mut(&args.source_node)
        .and_then(|by_type| by_type.get_mut(&args.connection_type))
    else {
        return false;
    };
    let Some(targets) = slots.get_mut(args.source_output as usize) else {
        return false;
    };

    let before = targets.len();
    targets.retain(|t| !(t.node == args.target_node && t.index == args.target_input));
    let removed = targets.len() != before;
    if removed {
        prune_connections(workflow);
    }
    removed
}

/// Drop trailing empty output slots and empty maps
fn prune_connections(workflow: &mut Workflow) {
    for by_type in workflow.connections.values_mut() {
        for slots in by_type.values_mut() {
            while slots.last().is_some_and(Vec::is_empty) {
                slots.pop();
            }
        }
        by_type.retain(|_, slots| !slots.is_empty());
    }
    workflow.connections.retain(|_, by_type| !by_type.is_empty());
}
