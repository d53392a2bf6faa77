//! Tool Registry
//!
//! Fixed table of tools built once at startup. Each entry carries the
//! advertised schema, the [`ToolKind`] tag that selects its argument parser
//! and handler, and the call policy applied by the dispatcher.

pub mod args;
pub mod handlers;
mod schema;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use n8nmcp_core::CallPolicy;

pub use args::ToolArgs;

/// Closed set of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListWorkflows,
    GetWorkflow,
    CreateWorkflow,
    UpdateWorkflow,
    DeleteWorkflow,
    ActivateWorkflow,
    DeactivateWorkflow,
    ExecuteWorkflow,
    AddNode,
    UpdateNode,
    RemoveNode,
    AddConnection,
    RemoveConnection,
    ListExecutions,
    GetExecution,
    ListVariables,
    CreateVariable,
    CreateCredential,
    ValidateWorkflow,
    AuditWorkflow,
}

impl ToolKind {
    pub const ALL: [ToolKind; 20] = [
        Self::ListWorkflows,
        Self::GetWorkflow,
        Self::CreateWorkflow,
        Self::UpdateWorkflow,
        Self::DeleteWorkflow,
        Self::ActivateWorkflow,
        Self::DeactivateWorkflow,
        Self::ExecuteWorkflow,
        Self::AddNode,
        Self::UpdateNode,
        Self::RemoveNode,
        Self::AddConnection,
        Self::RemoveConnection,
        Self::ListExecutions,
        Self::GetExecution,
        Self::ListVariables,
        Self::CreateVariable,
        Self::CreateCredential,
        Self::ValidateWorkflow,
        Self::AuditWorkflow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListWorkflows => "list_workflows",
            Self::GetWorkflow => "get_workflow",
            Self::CreateWorkflow => "create_workflow",
            Self::UpdateWorkflow => "update_workflow",
            Self::DeleteWorkflow => "delete_workflow",
            Self::ActivateWorkflow => "activate_workflow",
            Self::DeactivateWorkflow => "deactivate_workflow",
            Self::ExecuteWorkflow => "execute_workflow",
            Self::AddNode => "add_node",
            Self::UpdateNode => "update_node",
            Self::RemoveNode => "remove_node",
            Self::AddConnection => "add_connection",
            Self::RemoveConnection => "remove_connection",
            Self::ListExecutions => "list_executions",
            Self::GetExecution => "get_execution",
            Self::ListVariables => "list_variables",
            Self::CreateVariable => "create_variable",
            Self::CreateCredential => "create_credential",
            Self::ValidateWorkflow => "validate_workflow",
            Self::AuditWorkflow => "audit_workflow",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ListWorkflows => "List workflows, optionally filtered by active state, tags or name.",
            Self::GetWorkflow => "Get a workflow with its nodes, connections and settings.",
            Self::CreateWorkflow => "Create a new workflow.",
            Self::UpdateWorkflow => "Update a workflow's name, nodes, connections or settings.",
            Self::DeleteWorkflow => "Delete a workflow.",
            Self::ActivateWorkflow => "Activate a workflow so its triggers run.",
            Self::DeactivateWorkflow => "Deactivate a workflow.",
            Self::ExecuteWorkflow => "Run a workflow, optionally with input data.",
            Self::AddNode => "Add a node to a workflow. Node names must be unique within the workflow.",
            Self::UpdateNode => "Change a node's parameters, position or name.",
            Self::RemoveNode => "Remove a node and every connection touching it.",
            Self::AddConnection => "Connect an output of one node to an input of another.",
            Self::RemoveConnection => "Remove a connection between two nodes.",
            Self::ListExecutions => "List executions, optionally filtered by workflow and status.",
            Self::GetExecution => "Get a single execution, optionally with its run data.",
            Self::ListVariables => "List instance variables.",
            Self::CreateVariable => "Create an instance variable.",
            Self::CreateCredential => "Create a credential. Secret data is never returned.",
            Self::ValidateWorkflow => {
                "Check a workflow's structure: nodes, unique names, trigger presence and connection targets."
            }
            Self::AuditWorkflow => {
                "Review a workflow for hardcoded secrets, disabled nodes and missing error handling."
            }
        }
    }

    /// Tools whose upstream call changes n8n state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::ListWorkflows
                | Self::GetWorkflow
                | Self::ListExecutions
                | Self::GetExecution
                | Self::ListVariables
                | Self::ValidateWorkflow
                | Self::AuditWorkflow
        )
    }
}

/// Registry entry
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Arc<Map<String, Value>>,
    pub kind: ToolKind,
    pub policy: CallPolicy,
}

/// Immutable tool table
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build the registry. Mutating tools get `policy` with a single attempt.
    pub fn new(policy: CallPolicy) -> Self {
        let tools: Vec<ToolDescriptor> = ToolKind::ALL
            .iter()
            .map(|kind| ToolDescriptor {
                name: kind.name(),
                description: kind.description(),
                input_schema: Arc::new(schema::input_schema(*kind)),
                kind: *kind,
                policy: if kind.is_mutating() {
                    policy.single_attempt()
                } else {
                    policy
                },
            })
            .collect();
        let by_name = tools.iter().enumerate().map(|(i, t)| (t.name, i)).collect();
        Self { tools, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
