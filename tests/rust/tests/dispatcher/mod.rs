//! Dispatcher integration tests
//!
//! Tool calls end to end: dispatcher -> handler -> n8n client -> stub API.

mod end_to_end;
mod validation;
