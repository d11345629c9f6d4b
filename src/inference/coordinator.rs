//! Readiness gating and admission control for the shared inference resource.
//!
//! The coordinator is the single owner of the model state and the only path
//! to the engine. Every HTTP request funnels through [`InferenceCoordinator::generate`],
//! which checks readiness before anything else so clients get a fast, typed
//! error instead of a timeout when no model is loaded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tracing::{info, warn};

use crate::config::Config;
use crate::inference::backend::{InferenceBackend, ModelDescriptor, ModelHandle, SamplingParams};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("model not ready: no model is loaded")]
    ModelNotReady,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Snapshot of the model state, published on every change.
///
/// `model` falls back to the configured default identifier while nothing is
/// loaded, so consumers always have something to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatus {
    pub loaded: bool,
    pub model: String,
}

/// A completed generation.
#[derive(Debug)]
pub struct Generation {
    /// Generated text.
    pub text: String,

    /// Identifier of the model that served the request.
    pub model: String,

    /// Time spent inside the engine call.
    pub engine_time: Duration,
}

/// Gates and serializes access to the inference resource.
pub struct InferenceCoordinator {
    backend: Arc<dyn InferenceBackend>,
    config: Arc<Config>,

    /// Loaded-model handle; present iff a model is loaded. Writers hold the
    /// lock only for the swap, never across an engine await, so readers
    /// cannot observe a half-updated state.
    state: RwLock<Option<Arc<dyn ModelHandle>>>,

    /// Serializes loads against each other. Separate from `state` so an
    /// in-progress load never blocks readers.
    load_gate: Mutex<()>,

    /// Admission control for engine calls; see
    /// `ServerConfig::max_concurrent_generations`.
    gen_permits: Semaphore,

    status_tx: watch::Sender<ModelStatus>,
}

impl InferenceCoordinator {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: Arc<Config>) -> Self {
        let permits = config.server.max_concurrent_generations.max(1);
        let (status_tx, _) = watch::channel(ModelStatus {
            loaded: false,
            model: config.model.model_id.clone(),
        });

        Self {
            backend,
            config,
            state: RwLock::new(None),
            load_gate: Mutex::new(()),
            gen_permits: Semaphore::new(permits),
            status_tx,
        }
    }

    /// Current model state snapshot.
    pub fn status(&self) -> ModelStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to model state changes.
    pub fn subscribe(&self) -> watch::Receiver<ModelStatus> {
        self.status_tx.subscribe()
    }

    /// Load (or reload) a model through the engine.
    ///
    /// Loads are mutually exclusive. The state is swapped only after the
    /// engine reports success, so a failed load leaves the previous state
    /// untouched, whether that was empty or an earlier model.
    pub async fn load_model(&self, descriptor: &ModelDescriptor) -> Result<(), CoordinatorError> {
        let _gate = self.load_gate.lock().await;

        info!(
            model = descriptor.model_id,
            engine = self.backend.name(),
            "Loading model"
        );
        let started = Instant::now();

        let handle = self.backend.load(descriptor).await.map_err(|e| {
            warn!(model = descriptor.model_id, error = %e, "Model load failed");
            CoordinatorError::ModelLoad(e.to_string())
        })?;

        let model = handle.model_id().to_string();
        {
            let mut state = self.state.write().await;
            *state = Some(handle);
        }
        self.status_tx.send_replace(ModelStatus {
            loaded: true,
            model: model.clone(),
        });

        info!(
            model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(())
    }

    /// Generate a completion for `prompt`.
    ///
    /// Readiness is checked before anything else: with no model loaded this
    /// fails immediately and the engine is never invoked, even while a load
    /// is in progress (the request sees the state as it was). Parameters are
    /// validated next; only then does the request take a generation permit
    /// and reach the engine.
    pub async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Generation, CoordinatorError> {
        let handle = {
            let state = self.state.read().await;
            state.clone().ok_or(CoordinatorError::ModelNotReady)?
        };

        self.validate_params(prompt, temperature, max_tokens)?;

        let params = SamplingParams {
            temperature,
            max_tokens,
        };

        let _permit = self
            .gen_permits
            .acquire()
            .await
            .map_err(|_| CoordinatorError::Inference("coordinator is shutting down".to_string()))?;

        let started = Instant::now();
        let text = handle
            .infer(prompt, &params)
            .await
            .map_err(|e| CoordinatorError::Inference(e.to_string()))?;
        let engine_time = started.elapsed();

        Ok(Generation {
            text,
            model: handle.model_id().to_string(),
            engine_time,
        })
    }

    fn validate_params(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<(), CoordinatorError> {
        if prompt.is_empty() {
            return Err(CoordinatorError::InvalidParameter(
                "prompt must not be empty".to_string(),
            ));
        }
        if max_tokens == 0 {
            return Err(CoordinatorError::InvalidParameter(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        let limits = &self.config.limits;
        if !temperature.is_finite()
            || temperature < limits.temperature_min
            || temperature > limits.temperature_max
        {
            return Err(CoordinatorError::InvalidParameter(format!(
                "temperature {} outside accepted range [{}, {}]",
                temperature, limits.temperature_min, limits.temperature_max
            )));
        }
        Ok(())
    }
}
