//! Flowkeep server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowkeep::{create_router, spawn_snapshot_task, spawn_token_sweep_task, AppState, Config, Database};

/// Main entry point for the Flowkeep server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the tables and restore snapshots if enabled
/// 4. Start the token sweep and snapshot tasks
/// 5. Serve until SIGINT/SIGTERM, then write a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowkeep=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Flowkeep server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, data_dir={}, strategy={}, dump_interval={}s, token_sweep_interval={}s",
        config.server_port,
        config.data_dir.display(),
        config.cache_strategy,
        config.dump_interval,
        config.token_sweep_interval
    );
    if config.secret.is_none() {
        warn!("APP_PEPPER is not set: logins and sessions will fail");
    }

    let db = Arc::new(Database::new(config.cache_strategy));
    if config.load_on_start {
        let db = db.clone();
        let dir = config.data_dir.clone();
        tokio::task::spawn_blocking(move || db.load_all(&dir))
            .await
            .context("snapshot load task failed")?;
    } else {
        db.mark_ready();
    }

    let state = AppState::new(db.clone(), Arc::new(config.clone()));

    let tasks: Vec<JoinHandle<()>> = [
        spawn_token_sweep_task(state.tokens.clone(), config.token_sweep_interval),
        spawn_snapshot_task(db.clone(), config.data_dir.clone(), config.dump_interval),
    ]
    .into_iter()
    .flatten()
    .collect();

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    // Final snapshot
    let dir = config.data_dir.clone();
    tokio::task::spawn_blocking(move || db.dump_all(&dir))
        .await
        .context("final snapshot task failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
