//! HTTP Server
//!
//! Exposes the MCP protocol over the streamable HTTP transport at `/mcp`,
//! plus plain `GET /health`, `GET /metrics` and `GET /connections`.

mod handlers;
pub mod logging_middleware;
pub mod session;

pub use session::{SessionLayerState, SessionRegistry};

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::mcp::N8nMcpHandler;
use crate::state::ServerState;

/// HTTP front door.
///
/// Stops accepting when `cancel` fires; open SSE streams are closed through
/// a child token handed to rmcp.
pub struct HttpServer {
    state: Arc<ServerState>,
    cancel: CancellationToken,
}

impl HttpServer {
    pub fn new(state: Arc<ServerState>, cancel: CancellationToken) -> Self {
        Self { state, cancel }
    }

    pub fn build_router(&self) -> Router {
        let handler = N8nMcpHandler::new(self.state.clone());
        let session_manager = Arc::new(LocalSessionManager::default());
        let registry = Arc::new(SessionRegistry::new(session_manager.clone()));

        let mcp_service = StreamableHttpService::new(
            move || {
                debug!("[Server] Creating handler instance for MCP session");
                Ok(handler.clone())
            },
            session_manager,
            StreamableHttpServerConfig {
                stateful_mode: true,
                sse_keep_alive: Some(Duration::from_secs(30)),
                sse_retry: Some(Duration::from_secs(3)),
                cancellation_token: self.cancel.child_token(),
            },
        );

        let mcp_routes = Router::new()
            .nest_service("/mcp", mcp_service)
            .layer(middleware::from_fn_with_state(
                SessionLayerState {
                    server: self.state.clone(),
                    registry,
                },
                session::mcp_session_middleware,
            ));

        // Browser-based MCP inspectors need the session header exposed
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .route("/connections", get(handlers::connections))
            .with_state(self.state.clone())
            .merge(mcp_routes)
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(
                logging_middleware::http_logging_middleware,
            ))
            .layer(cors)
    }

    /// Bind the configured address and serve until cancelled
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.state.config().bind_addr();
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let router = self.build_router();
        info!(
            addr = %listener.local_addr()?,
            "[Server] Ready to accept connections at /mcp"
        );

        let cancel = self.cancel.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("[Server] Stopped");
        Ok(())
    }
}
