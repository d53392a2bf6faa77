//! Pooled connection record and its transport handle

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use n8nmcp_core::{
    ClientDescriptor, ConnectionId, ConnectionInfo, ConnectionState, GatewayResult, TransportKind,
};

/// Closes the protocol session behind a pooled connection.
///
/// Owned exclusively by the pool; called at most once, on removal.
#[async_trait]
pub trait TransportHandle: Send + Sync {
    async fn close(&self) -> GatewayResult<()>;
}

/// Handle that cancels a token, used for stdio sessions and tests
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TransportHandle for CancelHandle {
    async fn close(&self) -> GatewayResult<()> {
        self.0.cancel();
        Ok(())
    }
}

/// One client connection
pub struct Connection {
    pub id: ConnectionId,
    pub established_at: DateTime<Utc>,
    pub last_activity: Instant,
    pub client: ClientDescriptor,
    pub transport: TransportKind,
    pub state: ConnectionState,
    pub(crate) handle: Box<dyn TransportHandle>,
}

impl Connection {
    /// New `Pending` connection with a fresh id
    pub fn new(transport: TransportKind, client: ClientDescriptor, handle: Box<dyn TransportHandle>) -> Self {
        Self::with_id(ConnectionId::new(), transport, client, handle)
    }

    /// New `Pending` connection for an id allocated by the front door
    pub fn with_id(
        id: ConnectionId,
        transport: TransportKind,
        client: ClientDescriptor,
        handle: Box<dyn TransportHandle>,
    ) -> Self {
        Self {
            id,
            established_at: Utc::now(),
            last_activity: Instant::now(),
            client,
            transport,
            state: ConnectionState::Pending,
            handle,
        }
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            transport: self.transport,
            state: self.state,
            client: self.client.clone(),
            established_at: self.established_at,
            idle_ms: self.last_activity.elapsed().as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
