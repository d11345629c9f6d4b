//! Supervisor-facing lifecycle.
//!
//! Sequences "load model, then start gateway" on the start command and the
//! reverse on stop, publishing a phase and a human-readable status string
//! for the supervisor to surface. Load or bind failures land in `Failed`,
//! which sticks until the supervisor issues another command; there is no
//! auto-retry.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::config::Config;
use crate::inference::backend::ModelDescriptor;
use crate::inference::coordinator::InferenceCoordinator;
use crate::net;
use crate::server::gateway::GatewayServer;

/// Lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    LoadingModel,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::LoadingModel => "loading-model",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("gateway start failed: {0}")]
    GatewayStart(String),
}

/// Entry point for the process supervisor: two commands in, one status out.
pub struct LifecycleController {
    coordinator: Arc<InferenceCoordinator>,
    gateway: Arc<GatewayServer>,
    config: Arc<Config>,

    /// Serializes supervisor commands against each other.
    command_gate: Mutex<()>,

    phase_tx: watch::Sender<LifecyclePhase>,
    status_tx: watch::Sender<String>,
}

impl LifecycleController {
    pub fn new(
        coordinator: Arc<InferenceCoordinator>,
        gateway: Arc<GatewayServer>,
        config: Arc<Config>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(LifecyclePhase::Idle);
        let (status_tx, _) = watch::channel("idle".to_string());
        Self {
            coordinator,
            gateway,
            config,
            command_gate: Mutex::new(()),
            phase_tx,
            status_tx,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase_tx.borrow()
    }

    /// Human-readable status for the supervisor to display.
    pub fn status_string(&self) -> String {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    fn transition(&self, phase: LifecyclePhase, status: impl Into<String>) {
        let status = status.into();
        info!(phase = %phase, status, "Lifecycle transition");
        self.phase_tx.send_replace(phase);
        self.status_tx.send_replace(status);
    }

    /// Start command: load the configured model, then start the gateway.
    ///
    /// On load failure the gateway is never started. Re-delivery while
    /// already running is a logged no-op.
    pub async fn handle_start(&self) -> Result<(), LifecycleError> {
        let _gate = self.command_gate.lock().await;

        if self.phase() == LifecyclePhase::Running {
            warn!("Start requested while already running");
            return Ok(());
        }

        let descriptor = ModelDescriptor::from(&self.config.model);
        self.transition(
            LifecyclePhase::LoadingModel,
            format!("loading model {}", descriptor.model_id),
        );

        if let Err(e) = self.coordinator.load_model(&descriptor).await {
            self.transition(
                LifecyclePhase::Failed,
                format!("failed to load model {}: {e}", descriptor.model_id),
            );
            return Err(LifecycleError::ModelLoad(e.to_string()));
        }

        self.transition(LifecyclePhase::Starting, "starting gateway");

        let addr = match self.gateway.start(self.config.server.port).await {
            Ok(addr) => addr,
            Err(e) => {
                self.transition(LifecyclePhase::Failed, format!("failed to start gateway: {e}"));
                return Err(LifecycleError::GatewayStart(e.to_string()));
            }
        };

        // Advertise the LAN address rather than the bind address (usually
        // 0.0.0.0); the model identifier comes from the coordinator's
        // state notification.
        let model = self.coordinator.status().model;
        self.transition(
            LifecyclePhase::Running,
            format!(
                "serving {} at {}:{}",
                model,
                net::advertise_address(),
                addr.port()
            ),
        );
        Ok(())
    }

    /// Stop command: callable from any phase. Always attempts to stop the
    /// gateway (a no-op when it is not listening) and returns to `Idle`.
    pub async fn handle_stop(&self) {
        let _gate = self.command_gate.lock().await;

        self.transition(LifecyclePhase::Stopping, "stopping gateway");
        self.gateway.stop().await;
        self.transition(LifecyclePhase::Idle, "stopped");
    }
}
