use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use n8nmcp_core::{ClientDescriptor, GatewayResult, TransportKind};
use n8nmcp_gateway::{Connection, TransportHandle};

/// Counts how many transport handles were closed
#[derive(Clone, Default)]
pub struct CloseLog(Arc<AtomicUsize>);

impl CloseLog {
    pub fn closed(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> Box<dyn TransportHandle> {
        Box::new(RecordingHandle { log: self.clone() })
    }

    pub fn connection(&self, name: &str) -> Connection {
        Connection::new(
            TransportKind::Http,
            ClientDescriptor::new(name, "1.0"),
            self.handle(),
        )
    }
}

pub struct RecordingHandle {
    log: CloseLog,
}

#[async_trait]
impl TransportHandle for RecordingHandle {
    async fn close(&self) -> GatewayResult<()> {
        self.log.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
