//! HTTP handlers for the plain (non-MCP) routes

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::state::{HealthSnapshot, MetricsSnapshot, ServerState};

const DEFAULT_EVENT_LIMIT: usize = 100;

pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthSnapshot> {
    debug!("[Server] Health check");
    Json(state.health())
}

pub async fn metrics(State(state): State<Arc<ServerState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics())
}

#[derive(Debug, Deserialize)]
pub struct ConnectionsQuery {
    pub events: Option<usize>,
}

/// Pool diagnostics: live connections and the most recent lifecycle events
pub async fn connections(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ConnectionsQuery>,
) -> Json<Value> {
    let pool = state.pool();
    Json(json!({
        "connections": pool.connections(),
        "events": pool.recent_events(query.events.unwrap_or(DEFAULT_EVENT_LIMIT)),
    }))
}
