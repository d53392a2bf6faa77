//! Product naming used in protocol descriptors, logs and user agents

/// Server name advertised in the MCP initialize response
pub const SERVER_NAME: &str = "n8n-mcp-server";

/// Human-readable name
pub const DISPLAY_NAME: &str = "n8n MCP Server";

/// Binary name
pub const BINARY_NAME: &str = "n8nmcp";

/// Crate version, shared by every workspace member
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Instructions returned to MCP clients on initialize
pub const INSTRUCTIONS: &str = "Manage n8n workflows: list, inspect, create, edit nodes and \
connections, activate, execute and audit. Every tool returns a JSON envelope \
{success, data?, error?}.";
