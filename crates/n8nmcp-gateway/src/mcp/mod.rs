//! MCP Server Implementation
//!
//! - `handler`: implements rmcp's `ServerHandler`, forwarding `tools/call`
//!   to the dispatcher
//! - `context`: reads the session and connection identity that the HTTP
//!   front door attaches to each request

pub mod context;
pub mod handler;

pub use context::{CONNECTION_ID_HEADER, SESSION_ID_HEADER};
pub use handler::N8nMcpHandler;
