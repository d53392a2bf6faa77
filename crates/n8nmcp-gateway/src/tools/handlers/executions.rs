//! Execution history

use serde_json::{json, Value};

use n8nmcp_core::n8n::{ExecutionQuery, N8nApi};
use n8nmcp_core::GatewayResult;

pub async fn list(api: &dyn N8nApi, query: &ExecutionQuery) -> GatewayResult<Value> {
    let page = api.list_executions(query).await?;
    Ok(json!({
        "executions": page.data,
        "total": page.data.len(),
        "nextCursor": page.next_cursor,
    }))
}
