//! Binary entry point: the process-supervisor shim.
//!
//! Wires the engine, coordinator, gateway, and lifecycle controller
//! together, then drives the controller from OS signals: start on launch,
//! stop on ctrl-c / SIGTERM. A failed start exits non-zero so the OS
//! supervisor can restart the process.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use edge_llm_gateway::config::{Cli, Config};
use edge_llm_gateway::inference::backend::StubEngine;
use edge_llm_gateway::inference::coordinator::InferenceCoordinator;
use edge_llm_gateway::lifecycle::LifecycleController;
use edge_llm_gateway::server::gateway::GatewayServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "edge_llm_gateway=debug,tower_http=debug"
    } else {
        "edge_llm_gateway=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("edge-llm-gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration; CLI flags win over file values.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);
    let config = Arc::new(config);

    info!(
        model = config.model.model_id,
        host = config.server.host,
        port = config.server.port,
        max_concurrent = config.server.max_concurrent_generations,
        "Configuration loaded"
    );

    // Wire components: engine behind the backend seam, coordinator owning
    // model state, gateway owning the socket, controller sequencing both.
    let backend = Arc::new(StubEngine::new());
    let coordinator = Arc::new(InferenceCoordinator::new(backend, config.clone()));
    let gateway = Arc::new(GatewayServer::new(coordinator.clone(), config.clone()));
    let controller = LifecycleController::new(coordinator, gateway, config);

    if let Err(e) = controller.handle_start().await {
        error!(status = %controller.status_string(), "Startup failed");
        return Err(e.into());
    }
    info!(status = %controller.status_string(), "Gateway running");

    shutdown_signal().await;

    controller.handle_stop().await;
    info!(status = %controller.status_string(), "Shutdown complete");

    Ok(())
}

/// Wait for ctrl-c or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
