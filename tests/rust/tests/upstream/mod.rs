//! Upstream failure handling
//!
//! Retry, timeout and connectivity behavior against a stub n8n API.

mod connectivity;
mod paths;
mod retry;
