//! Typed tool arguments
//!
//! Raw JSON arguments are checked field by field against each tool's schema
//! and converted into a closed [`ToolArgs`] variant. Every offending field is
//! reported, not just the first.

use serde_json::{Map, Value};

use n8nmcp_core::n8n::{ExecutionQuery, ExecutionStatus, WorkflowQuery};
use n8nmcp_core::{FieldProblem, GatewayError, GatewayResult};

use super::ToolKind;

/// Largest page size n8n accepts
pub const MAX_PAGE_LIMIT: u64 = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateWorkflowArgs {
    pub name: String,
    pub nodes: Option<Vec<Value>>,
    pub connections: Option<Map<String, Value>>,
    pub settings: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateWorkflowArgs {
    pub workflow_id: String,
    pub name: Option<String>,
    pub nodes: Option<Vec<Value>>,
    pub connections: Option<Map<String, Value>>,
    pub settings: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub name: String,
    pub node_type: String,
    pub position: Option<[f64; 2]>,
    pub parameters: Option<Map<String, Value>>,
    pub type_version: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNodeArgs {
    pub workflow_id: String,
    pub node_name: String,
    pub parameters: Option<Map<String, Value>>,
    pub position: Option<[f64; 2]>,
    pub new_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionArgs {
    pub workflow_id: String,
    pub source_node: String,
    pub target_node: String,
    pub source_output: u32,
    pub target_input: u32,
    pub connection_type: String,
}

/// What `validate_workflow` inspects
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowSource {
    Id(String),
    Inline(Value),
}

/// Validated arguments, one variant per tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    ListWorkflows(WorkflowQuery),
    GetWorkflow { workflow_id: String },
    CreateWorkflow(CreateWorkflowArgs),
    UpdateWorkflow(UpdateWorkflowArgs),
    DeleteWorkflow { workflow_id: String },
    ActivateWorkflow { workflow_id: String },
    DeactivateWorkflow { workflow_id: String },
    ExecuteWorkflow { workflow_id: String, data: Option<Value> },
    AddNode { workflow_id: String, node: NewNode },
    UpdateNode(UpdateNodeArgs),
    RemoveNode { workflow_id: String, node_name: String },
    AddConnection(ConnectionArgs),
    RemoveConnection(ConnectionArgs),
    ListExecutions(ExecutionQuery),
    GetExecution { execution_id: String, include_data: bool },
    ListVariables,
    CreateVariable { key: String, value: String },
    CreateCredential { name: String, credential_type: String, data: Map<String, Value> },
    ValidateWorkflow(WorkflowSource),
    AuditWorkflow { workflow_id: String },
}

impl ToolArgs {
    /// Check `raw` against the schema of `kind`
    pub fn parse(kind: ToolKind, raw: &Value) -> GatewayResult<Self> {
        let mut r = ArgReader::new(kind.name(), raw)?;

        let args = match kind {
            ToolKind::ListWorkflows => ToolArgs::ListWorkflows(WorkflowQuery {
                active: r.opt_bool("active"),
                tags: r.opt_tags("tags"),
                name: r.opt_str("name"),
                limit: r.opt_limit("limit"),
                cursor: r.opt_str("cursor"),
            }),
            ToolKind::GetWorkflow => ToolArgs::GetWorkflow {
                workflow_id: r.id("workflowId"),
            },
            ToolKind::CreateWorkflow => ToolArgs::CreateWorkflow(CreateWorkflowArgs {
                name: r.req_str("name"),
                nodes: r.opt_array("nodes"),
                connections: r.opt_object("connections"),
                settings: r.opt_object("settings"),
            }),
            ToolKind::UpdateWorkflow => {
                let args = UpdateWorkflowArgs {
                    workflow_id: r.id("workflowId"),
                    name: r.opt_str("name"),
                    nodes: r.opt_array("nodes"),
                    connections: r.opt_object("connections"),
                    settings: r.opt_object("settings"),
                };
                if args.name.is_none()
                    && args.nodes.is_none()
                    && args.connections.is_none()
                    && args.settings.is_none()
                    && r.is_clean()
                {
                    r.problem("name", "at least one of name, nodes, connections or settings is required");
                }
                ToolArgs::UpdateWorkflow(args)
            }
            ToolKind::DeleteWorkflow => ToolArgs::DeleteWorkflow {
                workflow_id: r.id("workflowId"),
            },
            ToolKind::ActivateWorkflow => ToolArgs::ActivateWorkflow {
                workflow_id: r.id("workflowId"),
            },
            ToolKind::DeactivateWorkflow => ToolArgs::DeactivateWorkflow {
                workflow_id: r.id("workflowId"),
            },
            ToolKind::ExecuteWorkflow => ToolArgs::ExecuteWorkflow {
                workflow_id: r.id("workflowId"),
                data: r.opt_object("data").map(Value::Object),
            },
            ToolKind::AddNode => {
                let workflow_id = r.id("workflowId");
                let node = r.node("node");
                ToolArgs::AddNode { workflow_id, node }
            }
            ToolKind::UpdateNode => {
                let args = UpdateNodeArgs {
                    workflow_id: r.id("workflowId"),
                    node_name: r.req_str("nodeName"),
                    parameters: r.opt_object("parameters"),
                    position: r.opt_position("position"),
                    new_name: r.opt_str("newName"),
                };
                if args.parameters.is_none()
                    && args.position.is_none()
                    && args.new_name.is_none()
                    && r.is_clean()
                {
                    r.problem("parameters", "at least one of parameters, position or newName is required");
                }
                ToolArgs::UpdateNode(args)
            }
            ToolKind::RemoveNode => ToolArgs::RemoveNode {
                workflow_id: r.id("workflowId"),
                node_name: r.req_str("nodeName"),
            },
            ToolKind::AddConnection => ToolArgs::AddConnection(r.connection()),
            ToolKind::RemoveConnection => ToolArgs::RemoveConnection(r.connection()),
            ToolKind::ListExecutions => ToolArgs::ListExecutions(ExecutionQuery {
                workflow_id: r.opt_id("workflowId"),
                status: r.opt_status("status"),
                limit: r.opt_limit("limit"),
                include_data: r.opt_bool("includeData"),
                cursor: r.opt_str("cursor"),
            }),
            ToolKind::GetExecution => ToolArgs::GetExecution {
                execution_id: r.id("executionId"),
                include_data: r.opt_bool("includeData").unwrap_or(false),
            },
            ToolKind::ListVariables => ToolArgs::ListVariables,
            ToolKind::CreateVariable => ToolArgs::CreateVariable {
                key: r.variable_key("key"),
                value: r.req_str_allow_empty("value"),
            },
            ToolKind::CreateCredential => ToolArgs::CreateCredential {
                name: r.req_str("name"),
                credential_type: r.req_str("type"),
                data: r.req_object("data"),
            },
            ToolKind::ValidateWorkflow => {
                let id = r.opt_id("workflowId");
                let inline = r.opt_object("workflow");
                let source = match (id, inline) {
                    (Some(id), None) => WorkflowSource::Id(id),
                    (None, Some(wf)) => WorkflowSource::Inline(Value::Object(wf)),
                    (Some(_), Some(_)) => {
                        r.problem("workflowId", "provide either workflowId or workflow, not both");
                        WorkflowSource::Id(String::new())
                    }
                    (None, None) => {
                        if r.is_clean() {
                            r.problem("workflowId", "either workflowId or workflow is required");
                        }
                        WorkflowSource::Id(String::new())
                    }
                };
                ToolArgs::ValidateWorkflow(source)
            }
            ToolKind::AuditWorkflow => ToolArgs::AuditWorkflow {
                workflow_id: r.id("workflowId"),
            },
        };

        r.finish(args)
    }
}

/// Field-by-field reader that accumulates problems instead of failing fast
struct ArgReader<'a> {
    tool: &'a str,
    obj: Map<String, Value>,
    problems: Vec<FieldProblem>,
}

impl<'a> ArgReader<'a> {
    fn new(tool: &'a str, raw: &Value) -> GatewayResult<Self> {
        let obj = match raw {
            Value::Null => Map::new(),
            Value::Object(obj) => obj.clone(),
            _ => {
                return Err(GatewayError::validation(
                    tool,
                    "arguments",
                    "must be a JSON object",
                ))
            }
        };
        Ok(Self {
            tool,
            obj,
            problems: Vec::new(),
        })
    }

    fn problem(&mut self, field: &str, problem: &str) {
        self.problems.push(FieldProblem::new(field, problem));
    }

    fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    fn finish<T>(self, value: T) -> GatewayResult<T> {
        if self.problems.is_empty() {
            Ok(value)
        } else {
            Err(GatewayError::Validation {
                tool: self.tool.to_string(),
                problems: self.problems,
            })
        }
    }

    /// Present and non-null
    fn get(&self, field: &str) -> Option<&Value> {
        self.obj.get(field).filter(|v| !v.is_null())
    }

    fn req_str(&mut self, field: &str) -> String {
        match self.get(field) {
            None => {
                self.problem(field, "is required");
                String::new()
            }
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => {
                self.problem(field, "must not be empty");
                String::new()
            }
            Some(_) => {
                self.problem(field, "must be a string");
                String::new()
            }
        }
    }

    fn req_str_allow_empty(&mut self, field: &str) -> String {
        match self.get(field) {
            None => {
                self.problem(field, "is required");
                String::new()
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                self.problem(field, "must be a string");
                String::new()
            }
        }
    }

    fn opt_str(&mut self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.problem(field, "must be a string");
                None
            }
        }
    }

    /// n8n ids are strings; numeric ids are accepted and stringified
    fn id(&mut self, field: &str) -> String {
        match self.get(field) {
            None => {
                self.problem(field, "is required");
                String::new()
            }
            Some(_) => self.opt_id(field).unwrap_or_default(),
        }
    }

    fn opt_id(&mut self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) if s.trim().is_empty() => {
                self.problem(field, "must not be empty");
                None
            }
            Value::String(s) if !is_path_safe_id(s.trim()) => {
                self.problem(field, "must not contain '/', '?', '#' or '..'");
                None
            }
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) if n.is_u64() => Some(n.to_string()),
            _ => {
                self.problem(field, "must be a string id");
                None
            }
        }
    }

    fn opt_bool(&mut self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.problem(field, "must be a boolean");
                None
            }
        }
    }

    fn opt_u32(&mut self, field: &str, max: u64) -> Option<u32> {
        let value = self.get(field)?.clone();
        match value.as_u64() {
            Some(n) if n <= max => Some(n as u32),
            Some(_) => {
                self.problem(field, &format!("must be at most {}", max));
                None
            }
            None => {
                self.problem(field, "must be a non-negative integer");
                None
            }
        }
    }

    fn opt_limit(&mut self, field: &str) -> Option<u32> {
        let value = self.get(field)?.clone();
        match value.as_u64() {
            Some(n) if (1..=MAX_PAGE_LIMIT).contains(&n) => Some(n as u32),
            _ => {
                self.problem(field, &format!("must be an integer between 1 and {}", MAX_PAGE_LIMIT));
                None
            }
        }
    }

    fn opt_object(&mut self, field: &str) -> Option<Map<String, Value>> {
        match self.get(field)? {
            Value::Object(map) => Some(map.clone()),
            _ => {
                self.problem(field, "must be an object");
                None
            }
        }
    }

    fn req_object(&mut self, field: &str) -> Map<String, Value> {
        if self.get(field).is_none() {
            self.problem(field, "is required");
            return Map::new();
        }
        self.opt_object(field).unwrap_or_default()
    }

    fn opt_array(&mut self, field: &str) -> Option<Vec<Value>> {
        match self.get(field)? {
            Value::Array(items) => Some(items.clone()),
            _ => {
                self.problem(field, "must be an array");
                None
            }
        }
    }

    /// Comma-separated string or array of strings
    fn opt_tags(&mut self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let tags: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                match tags {
                    Some(tags) => Some(tags.join(",")),
                    None => {
                        self.problem(field, "must contain only strings");
                        None
                    }
                }
            }
            _ => {
                self.problem(field, "must be a string or an array of strings");
                None
            }
        }
    }

    fn opt_position(&mut self, field: &str) -> Option<[f64; 2]> {
        let value = self.get(field)?;
        match value.as_array().map(|a| a.as_slice()) {
            Some([x, y]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Some([x, y]),
                _ => {
                    self.problem(field, "must contain two numbers");
                    None
                }
            },
            _ => {
                self.problem(field, "must be an [x, y] array");
                None
            }
        }
    }

    fn opt_status(&mut self, field: &str) -> Option<ExecutionStatus> {
        let raw = self.opt_str(field)?;
        let status = ExecutionStatus::parse(&raw);
        if status.is_none() {
            self.problem(field, "must be one of error, success, waiting");
        }
        status
    }

    fn variable_key(&mut self, field: &str) -> String {
        let key = self.req_str(field);
        if !key.is_empty() && !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.problem(field, "may only contain letters, digits and underscores");
        }
        key
    }

    fn node(&mut self, field: &str) -> NewNode {
        let empty = NewNode {
            name: String::new(),
            node_type: String::new(),
            position: None,
            parameters: None,
            type_version: None,
        };
        let Some(obj) = self.opt_object_or_required(field) else {
            return empty;
        };

        let mut nested = ArgReader {
            tool: self.tool,
            obj,
            problems: Vec::new(),
        };
        let node = NewNode {
            name: nested.req_str("name"),
            node_type: nested.req_str("type"),
            position: nested.opt_position("position"),
            parameters: nested.opt_object("parameters"),
            type_version: match nested.get("typeVersion") {
                None => None,
                Some(v) if v.is_number() => Some(v.clone()),
                Some(_) => {
                    nested.problem("typeVersion", "must be a number");
                    None
                }
            },
        };
        for p in nested.problems {
            self.problems
                .push(FieldProblem::new(format!("{}.{}", field, p.field), p.problem));
        }
        node
    }

    fn opt_object_or_required(&mut self, field: &str) -> Option<Map<String, Value>> {
        if self.get(field).is_none() {
            self.problem(field, "is required");
            return None;
        }
        self.opt_object(field)
    }

    fn connection(&mut self) -> ConnectionArgs {
        ConnectionArgs {
            workflow_id: self.id("workflowId"),
            source_node: self.req_str("sourceNode"),
            target_node: self.req_str("targetNode"),
            source_output: self.opt_u32("sourceOutput", 64).unwrap_or(0),
            target_input: self.opt_u32("targetInput", 64).unwrap_or(0),
            connection_type: self.opt_str("connectionType").unwrap_or_else(|| "main".to_string()),
        }
    }
}

/// Ids end up as a single URL path segment upstream
fn is_path_safe_id(id: &str) -> bool {
    !id.contains(['/', '\\', '?', '#']) && !id.contains("..")
}
