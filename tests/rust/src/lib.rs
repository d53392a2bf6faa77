//! Shared test utilities and fixtures for n8n MCP gateway integration tests.

use std::sync::Arc;
use std::time::Duration;

use n8nmcp_core::{GatewayConfig, N8nClient, N8nConfig};
use n8nmcp_gateway::ServerState;

/// Stub n8n API on top of wiremock
pub mod n8n;
pub use n8n::StubN8n;

/// Recording transport handles for pool tests
pub mod handles;
pub use handles::{CloseLog, RecordingHandle};

pub const TEST_API_KEY: &str = "test-api-key";

/// Config pointing at `base_url` with fast retries so tests stay quick
pub fn test_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        n8n: N8nConfig {
            base_url: base_url.to_string(),
            api_key: TEST_API_KEY.to_string(),
        },
        skip_connectivity_check: true,
        ..GatewayConfig::default()
    }
    .with_retry(3, Duration::from_millis(10))
}

/// Server state backed by a real `N8nClient`
pub fn state_for(config: GatewayConfig) -> Arc<ServerState> {
    let client = N8nClient::new(&config.n8n).expect("valid n8n config");
    Arc::new(ServerState::new(config, Arc::new(client)))
}

/// Poll `condition` every 10ms until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
