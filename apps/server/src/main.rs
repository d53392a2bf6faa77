//! n8n MCP Server
//!
//! Run with:
//! ```not_rust
//! N8N_API_KEY=... n8nmcp
//! n8nmcp --transport http --port 3000
//! ```

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use n8nmcp_core::branding;
use n8nmcp_core::{GatewayConfig, GatewayError, N8nApi, N8nClient, TransportKind};
use n8nmcp_gateway::{run_stdio, HttpServer, ServerState};

/// Console layer on stderr (stdout carries the stdio protocol), plus an
/// optional daily-rotated file layer
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Crate names use underscores in targets (n8nmcp-core -> n8nmcp_core)
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,n8nmcp_core=debug,n8nmcp_gateway=debug,n8nmcp=debug")
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(branding::BINARY_NAME)
                .filename_suffix("log")
                .build(dir)?;
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Cancel `cancel` on Ctrl-C or SIGTERM
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        info!("Shutdown signal received");
        cancel.cancel();
    });
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let client = N8nClient::new(&config.n8n)?;
    if config.skip_connectivity_check {
        warn!("Skipping n8n connectivity check");
    } else {
        client.check_connectivity().await.map_err(|e| {
            GatewayError::initialization(format!("n8n API check against {} failed: {}", config.n8n.base_url, e))
        })?;
        info!(url = %config.n8n.base_url, "n8n API reachable");
    }

    let transport = config.transport;
    let state = Arc::new(ServerState::new(config, Arc::new(client)));
    state.pool().start_sweeper();

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let result = match transport {
        TransportKind::Stdio => run_stdio(state.clone(), cancel.clone()).await.map(|end| {
            info!(?end, "stdio session finished");
        }),
        TransportKind::Http => HttpServer::new(state.clone(), cancel.clone()).run().await,
    };

    cancel.cancel();
    state.pool().shutdown().await;
    info!(
        requests = state.metrics().request_count,
        uptime_secs = state.uptime_secs(),
        "{} stopped",
        branding::DISPLAY_NAME
    );
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();
    let config = args.into_config();

    let _guard = match init_tracing(config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        error!(kind = %e.kind(), "{}", e);
        return ExitCode::FAILURE;
    }

    info!(
        version = branding::VERSION,
        transport = %config.transport,
        n8n_url = %config.n8n.base_url,
        "Starting {}",
        branding::DISPLAY_NAME
    );

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
