//! API Box HTTP Server binary

use apibox_core::logging::{init_tracing, LogFormat};
use apibox_core::reload::{ReloadCoordinator, ReloadEvent};
use apibox_core::{load_main_config, AuthorizationEngine};
use apibox_server::{build_router, config_path, metrics, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());

    info!("Starting API Box server v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    metrics::init_prometheus()?;
    metrics::init_metrics();

    let config_path = config_path(std::env::var("APIBOX_CONFIG").ok());
    let config = load_main_config(&config_path)?;
    metrics::update_loaded_remotes(config.remotes.len());

    let engine = Arc::new(AuthorizationEngine::new(config));

    if env_flag("APIBOX_WATCH", true) {
        let mut coordinator = ReloadCoordinator::new(engine.store().clone())?;
        coordinator.watch_file(&config_path)?;
        let events = coordinator.subscribe();

        tokio::spawn(report_reloads(events, engine.clone()));
        tokio::spawn(async move {
            if let Err(e) = coordinator.run().await {
                error!("Reload coordinator stopped: {}", e);
            }
        });
        info!("Watching {:?} for changes", config_path);
    }

    // Create application state
    let debug = std::env::var("DEBUG").is_ok();
    let app = build_router(AppState::with_debug(engine, debug));

    // Get bind address from environment or use default
    let addr: SocketAddr = std::env::var("BIND_ADDRESS")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server shutdown complete");
    Ok(())
}

/// Mirror reload outcomes into Prometheus
async fn report_reloads(
    mut events: mpsc::UnboundedReceiver<ReloadEvent>,
    engine: Arc<AuthorizationEngine>,
) {
    while let Some(event) = events.recv().await {
        metrics::record_reload(event.result.as_str());
        metrics::update_loaded_remotes(engine.snapshot().remotes.len());
    }
}
