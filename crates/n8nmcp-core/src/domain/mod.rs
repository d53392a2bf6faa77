//! Shared domain types

mod connection;
mod tool;

pub use connection::*;
pub use tool::*;
