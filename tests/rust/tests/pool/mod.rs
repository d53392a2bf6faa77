//! Connection pool integration tests
//!
//! Capacity under concurrency, idle eviction and drain.

mod admission;
mod lifecycle;
