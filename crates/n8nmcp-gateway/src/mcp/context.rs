//! Request identity carried in rmcp extensions

use rmcp::model::Extensions;

use n8nmcp_core::ConnectionId;

/// Session header issued by the streamable HTTP transport
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Injected by the session middleware once a request is bound to a pooled
/// connection; rmcp preserves it in the request `Parts`
pub const CONNECTION_ID_HEADER: &str = "x-n8nmcp-connection-id";

/// Pooled connection of an HTTP request, `None` for stdio or when the
/// middleware did not run
pub fn extract_connection_id(extensions: &Extensions) -> Option<ConnectionId> {
    extensions
        .get::<http::request::Parts>()?
        .headers
        .get(CONNECTION_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
