//! Request correlation for the HTTP front door
//!
//! Every HTTP request gets a short trace id carried by a tracing span. `/mcp`
//! POSTs are additionally summarized by JSON-RPC method and, for
//! `tools/call`, the tool name.

mod request_trace;

pub use request_trace::{new_trace_id, JsonRpcSummary, RequestTrace, MAX_RPC_BODY_BYTES};
