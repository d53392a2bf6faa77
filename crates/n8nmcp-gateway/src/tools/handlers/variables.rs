//! Variables and credentials

use serde_json::{json, Map, Value};

use n8nmcp_core::n8n::N8nApi;
use n8nmcp_core::GatewayResult;

pub async fn list(api: &dyn N8nApi) -> GatewayResult<Value> {
    let page = api.list_variables().await?;
    Ok(json!({
        "variables": page.data,
        "total": page.data.len(),
    }))
}

/// n8n answers `201` with an empty body; echo what was created
pub async fn create(api: &dyn N8nApi, key: &str, value: &str) -> GatewayResult<Value> {
    let created = api.create_variable(key, value).await?;
    if created.is_null() {
        return Ok(json!({ "key": key, "value": value }));
    }
    Ok(created)
}

/// Create a credential. The secret `data` is never part of the result.
pub async fn create_credential(
    api: &dyn N8nApi,
    name: &str,
    credential_type: &str,
    data: &Map<String, Value>,
) -> GatewayResult<Value> {
    let body = json!({
        "name": name,
        "type": credential_type,
        "data": data,
    });
    let mut created = api.create_credential(&body).await?;
    if let Some(obj) = created.as_object_mut() {
        obj.remove("data");
    }
    Ok(created)
}
