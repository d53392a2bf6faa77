//! n8n MCP Gateway
//!
//! MCP server that exposes n8n workflow management as tools:
//! - Tool registry and dispatcher with per-tool call policies
//! - Bounded connection pool with idle eviction and graceful drain
//! - Streamable HTTP and stdio front doors over one shared core
//! - Health and metrics snapshots

pub mod dispatcher;
pub mod logging;
pub mod mcp;
pub mod pool;
pub mod server;
pub mod state;
pub mod stdio;
pub mod tools;

pub use dispatcher::{CounterSnapshot, Dispatcher};
pub use mcp::N8nMcpHandler;
pub use pool::{CancelHandle, Connection, ConnectionPool, TransportHandle};
pub use server::HttpServer;
pub use state::{HealthSnapshot, MetricsSnapshot, ServerState};
pub use stdio::{run_stdio, serve_session, SessionEnd};
pub use tools::{ToolDescriptor, ToolKind, ToolRegistry};
