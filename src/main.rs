//! Windfile server binary
//!
//! Serves the Drive file manager API with the server-side TTL cache in
//! front of Google Drive.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use windfile::config::DriveBackend;
use windfile::drive::{DriveApi, GoogleDrive, InMemoryDrive};
use windfile::{create_router, spawn_cleanup_task, AppState, Config};

/// Main entry point for the Windfile server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the Drive backend and the server cache
/// 4. Start background TTL cleanup task
/// 5. Serve HTTP until SIGINT/SIGTERM, then stop the sweep
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "windfile=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Windfile server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: folder={}, default_ttl={}s, user_info_ttl={}s, files_ttl={}s, cleanup_interval={}s, port={}",
        config.folder_id,
        config.default_ttl,
        config.user_info_ttl,
        config.files_ttl,
        config.cleanup_interval,
        config.server_port
    );

    let drive: Arc<dyn DriveApi> = match config.drive_backend {
        DriveBackend::Google => Arc::new(GoogleDrive::new().context("building Drive client")?),
        DriveBackend::Memory => {
            warn!("using in-memory Drive backend; files are not persisted");
            Arc::new(InMemoryDrive::open())
        }
    };

    let port = config.server_port;
    let cleanup_interval = config.cleanup_interval();
    let state = AppState::from_config(config, drive);
    let cleanup = spawn_cleanup_task(state.cache.clone(), cleanup_interval);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cleanup.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
