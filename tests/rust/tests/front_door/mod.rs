//! Protocol front doors
//!
//! Real rmcp clients against the stdio session loop and the Streamable HTTP
//! server, backed by a stub n8n API.

mod http;
mod stdio;

use rmcp::model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation};
use serde_json::Value;

pub fn client_info(name: &str) -> ClientInfo {
    ClientInfo {
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn call(tool: &str, arguments: Value) -> CallToolRequestParams {
    CallToolRequestParams {
        name: tool.to_string().into(),
        arguments: arguments.as_object().cloned(),
        task: None,
        meta: None,
    }
}
