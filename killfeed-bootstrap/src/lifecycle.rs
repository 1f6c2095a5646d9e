use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use killfeed_application::commands::cursor_commands::reset_cursor;
use killfeed_application::{AppState, IngestScheduler};
use killfeed_infrastructure::AppConfig;
use killfeed_interfaces_http::build_router;

use crate::context::AppContext;

/// Dedicated runtime for polling so slow remote reads never starve the HTTP
/// workers. The runtime lives on its own thread until `stop` is called.
pub struct IngestRuntime {
    handle: Handle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl IngestRuntime {
    pub fn start(servers: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(servers.max(1))
            .thread_name("killfeed-ingest-rt")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let worker = std::thread::Builder::new()
            .name("killfeed-ingest".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let _ = shutdown_rx.await;
                });
            })?;

        Ok(Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Blocks until the runtime thread exits.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("ingest runtime thread panicked");
            }
        }
    }
}

fn build_router_with_layers(state: AppState) -> Router {
    build_router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_standalone(config: AppConfig) -> Result<()> {
    let context = AppContext::new(config).await?;

    let ingest = IngestRuntime::start(context.servers.len())?;
    let scheduler = IngestScheduler::new(ingest.handle(), context.ingest_deps());
    let mut scheduled = 0usize;
    for server in context.servers.iter().cloned() {
        if scheduler.start_server(server).await {
            scheduled += 1;
        }
    }
    info!(
        scheduled,
        configured = context.servers.len(),
        "ingest scheduler started"
    );

    let state = context.state;
    let app = build_router_with_layers(state.clone());
    let addr: SocketAddr = state.config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("shutting down ingest");
    scheduler.shutdown().await;
    tokio::task::spawn_blocking(move || ingest.stop()).await?;

    served?;
    Ok(())
}

/// Rewinds one cursor offline. The next `serve` re-reads that file from line 0.
pub async fn run_reset_cursor(
    config: AppConfig,
    guild_id: u64,
    server_id: &str,
    role: &str,
) -> Result<()> {
    let context = AppContext::new(config).await?;
    let cursor = reset_cursor(&context.state, Some(guild_id), Some(server_id), role).await?;
    info!(
        tenant = %cursor.tenant,
        role = %cursor.role,
        file = %cursor.tracked_file_name,
        "cursor reset"
    );
    if context.config.store_path.is_none() {
        warn!("no store_path configured; the reset is not persisted");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "sigterm handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
