//! Structural validation and security audit of workflows

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::{json, Value};

use n8nmcp_core::n8n::{N8nApi, Workflow};
use n8nmcp_core::{GatewayError, GatewayResult};

use super::load_workflow;
use crate::tools::args::WorkflowSource;
use crate::tools::ToolKind;

/// Parameter keys that usually hold secrets
const SECRET_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "apikey",
    "api_key",
    "accesskey",
    "access_key",
    "privatekey",
    "private_key",
    "authorization",
    "clientsecret",
    "client_secret",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub node_count: usize,
    pub connection_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    Info,
}

#[derive(Debug, Serialize)]
pub struct AuditIssue {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub message: String,
}

pub async fn validate(api: &dyn N8nApi, source: &WorkflowSource) -> GatewayResult<Value> {
    let workflow = match source {
        WorkflowSource::Id(id) => load_workflow(api, id).await?,
        WorkflowSource::Inline(raw) => Workflow::from_value(raw.clone()).map_err(|e| {
            GatewayError::validation(
                ToolKind::ValidateWorkflow.name(),
                "workflow",
                format!("not a workflow: {}", e),
            )
        })?,
    };
    Ok(json!(validation_report(&workflow)))
}

pub async fn audit(api: &dyn N8nApi, workflow_id: &str) -> GatewayResult<Value> {
    let workflow = load_workflow(api, workflow_id).await?;
    Ok(audit_report(workflow_id, &workflow))
}

/// Structural checks. Errors make a workflow unusable, warnings do not.
pub fn validation_report(workflow: &Workflow) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if workflow.nodes.is_empty() {
        errors.push("workflow has no nodes".to_string());
    }

    let mut seen = HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.name.as_str()) {
            errors.push(format!("duplicate node name '{}'", node.name));
        }
    }

    let mut connected: HashSet<&str> = HashSet::new();
    for (source, by_type) in &workflow.connections {
        if !seen.contains(source.as_str()) {
            errors.push(format!("connection from unknown node '{}'", source));
        }
        for targets in by_type.values().flatten() {
            for target in targets {
                if !seen.contains(target.node.as_str()) {
                    errors.push(format!(
                        "connection from '{}' to unknown node '{}'",
                        source, target.node
                    ));
                }
                connected.insert(source.as_str());
                connected.insert(target.node.as_str());
            }
        }
    }

    if !workflow.nodes.is_empty() && !workflow.nodes.iter().any(|n| n.is_trigger()) {
        warnings.push("workflow has no trigger node; it can only be run manually via the API".to_string());
    }

    if workflow.nodes.len() > 1 {
        for node in &workflow.nodes {
            if !connected.contains(node.name.as_str()) && !is_sticky_note(&node.node_type) {
                warnings.push(format!("node '{}' is not connected", node.name));
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        node_count: workflow.nodes.len(),
        connection_count: workflow.connection_count(),
    }
}

/// Heuristic review: hardcoded secrets, disabled nodes, error handling and
/// activation state
pub fn audit_report(workflow_id: &str, workflow: &Workflow) -> Value {
    let mut issues = Vec::new();
    let mut node_types: BTreeMap<&str, usize> = BTreeMap::new();

    for node in &workflow.nodes {
        *node_types.entry(node.node_type.as_str()).or_default() += 1;

        let mut found = Vec::new();
        for (key, value) in &node.parameters {
            find_secrets(key, value, key, &mut found);
        }
        for path in found {
            issues.push(AuditIssue {
                severity: Severity::High,
                node: Some(node.name.clone()),
                message: format!("parameter '{}' looks like a hardcoded secret; use a credential instead", path),
            });
        }

        if node.is_disabled() {
            issues.push(AuditIssue {
                severity: Severity::Low,
                node: Some(node.name.clone()),
                message: "node is disabled".to_string(),
            });
        }
    }

    let has_error_workflow = workflow
        .settings
        .as_ref()
        .and_then(|s| s.get("errorWorkflow"))
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !has_error_workflow {
        issues.push(AuditIssue {
            severity: Severity::Medium,
            node: None,
            message: "no error workflow configured; failures will go unnoticed".to_string(),
        });
    }

    if !workflow.nodes.iter().any(|n| n.is_trigger()) {
        issues.push(AuditIssue {
            severity: Severity::Medium,
            node: None,
            message: "workflow has no trigger node".to_string(),
        });
    }

    if workflow.active != Some(true) {
        issues.push(AuditIssue {
            severity: Severity::Info,
            node: None,
            message: "workflow is inactive".to_string(),
        });
    }

    issues.sort_by_key(|i| i.severity);

    let mut by_severity: HashMap<Severity, usize> = HashMap::new();
    for issue in &issues {
        *by_severity.entry(issue.severity).or_default() += 1;
    }

    json!({
        "workflowId": workflow_id,
        "name": workflow.name,
        "nodeCount": workflow.nodes.len(),
        "connectionCount": workflow.connection_count(),
        "nodeTypes": node_types,
        "summary": {
            "high": by_severity.get(&Severity::High).copied().unwrap_or(0),
            "medium": by_severity.get(&Severity::Medium).copied().unwrap_or(0),
            "low": by_severity.get(&Severity::Low).copied().unwrap_or(0),
            "info": by_severity.get(&Severity::Info).copied().unwrap_or(0),
        },
        "issues": issues,
    })
}

fn is_sticky_note(node_type: &str) -> bool {
    node_type.ends_with(".stickyNote")
}

/// Walk parameters and collect paths of literal values under secret-like keys.
/// n8n expressions (`={{ ... }}`) are references, not literals.
fn find_secrets(key: &str, value: &Value, path: &str, found: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let literal = !s.is_empty() && !s.starts_with('=');
            let normalized = key.to_ascii_lowercase().replace('-', "_");
            let secret_key = SECRET_KEYS.iter().any(|k| normalized.contains(k));
            let bearer = s.trim_start().to_ascii_lowercase().starts_with("bearer ");
            if literal && (secret_key || bearer) {
                found.push(path.to_string());
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                find_secrets(k, v, &format!("{}.{}", path, k), found);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                find_secrets(key, v, &format!("{}[{}]", path, i), found);
            }
        }
        _ => {}
    }
}
