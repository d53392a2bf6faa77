//! n8n REST API payload types
//!
//! Only the parts of a workflow that the gateway edits are typed. Unknown
//! fields are carried through `extra` so a GET-modify-PUT cycle never drops
//! data n8n sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page of a cursor-paginated list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// `GET /workflows` query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowQuery {
    pub active: Option<bool>,
    pub tags: Option<String>,
    pub name: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl WorkflowQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(active) = self.active {
            pairs.push(("active", active.to_string()));
        }
        if let Some(tags) = &self.tags {
            pairs.push(("tags", tags.clone()));
        }
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }
}

/// Execution status filter accepted by `GET /executions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Error,
    Success,
    Waiting,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Success => "success",
            Self::Waiting => "waiting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "success" => Some(Self::Success),
            "waiting" => Some(Self::Waiting),
            _ => None,
        }
    }
}

/// `GET /executions` query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionQuery {
    pub workflow_id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub limit: Option<u32>,
    pub include_data: Option<bool>,
    pub cursor: Option<String>,
}

impl ExecutionQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = &self.workflow_id {
            pairs.push(("workflowId", id.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(include) = self.include_data {
            pairs.push(("includeData", include.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }
}

/// Target end of a connection, as n8n stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub index: u32,
}

/// Output slot -> list of targets
pub type OutputSlots = Vec<Vec<ConnectionTarget>>;

/// source node -> connection type -> output slots
pub type Connections = BTreeMap<String, BTreeMap<String, OutputSlots>>;

/// Workflow node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_version: Option<Value>,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Trigger nodes start a workflow without an inbound connection
    pub fn is_trigger(&self) -> bool {
        let ty = self.node_type.to_ascii_lowercase();
        ty.ends_with("trigger") || ty.ends_with(".webhook") || ty.ends_with(".start") || ty.contains("trigger.")
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }
}

/// Workflow with typed nodes and connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Connections,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .values()
            .flat_map(|by_type| by_type.values())
            .flat_map(|slots| slots.iter())
            .map(|targets| targets.len())
            .sum()
    }

    /// Body accepted by `PUT /workflows/:id`. n8n rejects read-only fields
    /// such as `id`, `active` and `tags` on update.
    pub fn update_payload(&self) -> Value {
        let mut body = Map::new();
        body.insert("name".into(), Value::String(self.name.clone()));
        body.insert(
            "nodes".into(),
            serde_json::to_value(&self.nodes).unwrap_or(Value::Array(Vec::new())),
        );
        body.insert(
            "connections".into(),
            serde_json::to_value(&self.connections).unwrap_or(Value::Object(Map::new())),
        );
        body.insert(
            "settings".into(),
            self.settings.clone().unwrap_or(Value::Object(Map::new())),
        );
        if let Some(static_data) = self.extra.get("staticData").filter(|v| !v.is_null()) {
            body.insert("staticData".into(), static_data.clone());
        }
        Value::Object(body)
    }
}

/// Compact listing entry for `list_workflows`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: Value,
    pub name: String,
    pub active: bool,
    pub node_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,
}

impl WorkflowSummary {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: value.get("id").cloned().unwrap_or(Value::Null),
            name: value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            active: value.get("active").and_then(Value::as_bool).unwrap_or(false),
            node_count: value
                .get("nodes")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
            tags: value.get("tags").cloned(),
            created_at: value.get("createdAt").cloned(),
            updated_at: value.get("updatedAt").cloned(),
        }
    }
}
