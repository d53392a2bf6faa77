//! Tool Dispatcher
//!
//! Single entry point for tool calls from every front door. `dispatch`
//! always returns a [`ToolResult`]: unknown tools, invalid arguments,
//! upstream failures, timeouts and handler panics all become `Failure`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use n8nmcp_core::{GatewayError, GatewayResult, N8nApi, ToolInvocation, ToolResult};

use crate::pool::describe_panic;
use crate::tools::{handlers, ToolArgs, ToolRegistry};

/// Request/success/failure counters, updated atomically per dispatch
#[derive(Debug, Default)]
pub struct DispatchCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl DispatchCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            request_count: self.requests.load(Ordering::Relaxed),
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// One counted request. Settles as a failure if the dispatch is dropped
/// before an outcome is recorded (client cancellation, session teardown).
struct InFlight<'a> {
    counters: &'a DispatchCounters,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn begin(counters: &'a DispatchCounters) -> Self {
        counters.requests.fetch_add(1, Ordering::Relaxed);
        Self {
            counters,
            settled: false,
        }
    }

    fn settle(mut self, success: bool) {
        let counter = if success {
            &self.counters.successes
        } else {
            &self.counters.failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            debug!("Tool call abandoned before completion");
        }
    }
}

/// Routes validated invocations to handlers under each tool's call policy
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    api: Arc<dyn N8nApi>,
    counters: DispatchCounters,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, api: Arc<dyn N8nApi>) -> Self {
        Self {
            registry,
            api,
            counters: DispatchCounters::default(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolResult {
        let in_flight = InFlight::begin(&self.counters);
        let tool = invocation.tool_name.as_str();
        let connection_id = invocation
            .connection_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());

        let result = match AssertUnwindSafe(self.run(&invocation)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = describe_panic(&*panic);
                error!(tool, connection_id = %connection_id, panic = %message, "Tool handler panicked");
                Err(GatewayError::Upstream {
                    method: "CALL".to_string(),
                    endpoint: "internal".to_string(),
                    status: None,
                    body: None,
                    message: format!("handler for {} failed unexpectedly", tool),
                })
            }
        };

        let elapsed_ms = (chrono::Utc::now() - invocation.requested_at).num_milliseconds();
        in_flight.settle(result.is_ok());
        match &result {
            Ok(_) => {
                info!(tool, connection_id = %connection_id, elapsed_ms, "Tool call succeeded");
            }
            Err(e) => {
                warn!(
                    tool,
                    connection_id = %connection_id,
                    kind = %e.kind(),
                    status = ?e.status_code(),
                    elapsed_ms,
                    error = %e,
                    "Tool call failed"
                );
            }
        }

        ToolResult::from(result)
    }

    async fn run(&self, invocation: &ToolInvocation) -> GatewayResult<serde_json::Value> {
        let Some(descriptor) = self.registry.get(&invocation.tool_name) else {
            return Err(GatewayError::UnknownTool {
                tool: invocation.tool_name.clone(),
                available: self.registry.names(),
            });
        };

        let args = ToolArgs::parse(descriptor.kind, &invocation.raw_arguments)?;
        debug!(tool = descriptor.name, "Arguments validated");

        let api = self.api.as_ref();
        let args = &args;
        descriptor
            .policy
            .run(descriptor.name, move || handlers::execute(api, args))
            .await
    }
}
