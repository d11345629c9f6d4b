//! Listening-socket lifecycle for the gateway.
//!
//! Owns the run state (bound address + serve task) and provides orderly
//! start/stop: stop signals graceful shutdown, gives in-flight requests a
//! bounded grace window, then aborts whatever remains. Stop is idempotent;
//! start never silently rebinds.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::Config;
use crate::inference::coordinator::InferenceCoordinator;
use crate::server::openai_api::{build_router, AppState};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway already listening on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

struct RunningGateway {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    serve_task: JoinHandle<()>,
}

/// HTTP-facing component: translates requests into coordinator calls and
/// owns the process-wide listening socket.
pub struct GatewayServer {
    coordinator: Arc<InferenceCoordinator>,
    config: Arc<Config>,
    running: Mutex<Option<RunningGateway>>,
}

impl GatewayServer {
    pub fn new(coordinator: Arc<InferenceCoordinator>, config: Arc<Config>) -> Self {
        Self {
            coordinator,
            config,
            running: Mutex::new(None),
        }
    }

    /// Bind and start serving on `port`.
    ///
    /// Returns the bound address once the listener is accepting connections;
    /// the accept loop runs on its own task. Port 0 selects an ephemeral
    /// port. Fails with [`GatewayError::AlreadyRunning`] when already
    /// listening.
    pub async fn start(&self, port: u16) -> Result<SocketAddr, GatewayError> {
        let mut running = self.running.lock().await;
        if let Some(gateway) = running.as_ref() {
            return Err(GatewayError::AlreadyRunning(gateway.local_addr));
        }

        let addr = format!("{}:{}", self.config.server.host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| GatewayError::Bind { addr, source })?;

        let state = Arc::new(AppState {
            coordinator: self.coordinator.clone(),
            start_time: Instant::now(),
        });
        let app = build_router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serve_task = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!(error = %e, "Server error");
            }
        });

        info!(addr = %local_addr, "Gateway listening");
        *running = Some(RunningGateway {
            local_addr,
            shutdown_tx,
            serve_task,
        });
        Ok(local_addr)
    }

    /// Stop serving.
    ///
    /// No-op when not running. Otherwise stops accepting new connections,
    /// waits up to `shutdown_grace_ms` for in-flight requests to drain, then
    /// aborts the serve task.
    pub async fn stop(&self) {
        let Some(gateway) = self.running.lock().await.take() else {
            return;
        };

        let _ = gateway.shutdown_tx.send(());

        let grace = Duration::from_millis(self.config.server.shutdown_grace_ms);
        let abort = gateway.serve_task.abort_handle();
        match timeout(grace, gateway.serve_task).await {
            Ok(_) => info!("Gateway stopped"),
            Err(_) => {
                warn!(
                    grace_ms = self.config.server.shutdown_grace_ms,
                    "Grace window elapsed, closing remaining connections"
                );
                abort.abort();
            }
        }
    }

    pub async fn is_listening(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|g| g.local_addr)
    }
}
