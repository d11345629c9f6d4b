//! Inference engine seam.
//!
//! The gateway treats the engine as an opaque capability behind two traits:
//! an [`InferenceBackend`] that loads models and a [`ModelHandle`] that
//! generates text. Both calls may be slow (weights off device storage,
//! token-by-token decoding) and are never retried here.
//!
//! For the initial implementation, [`StubEngine`] simulates an on-device
//! engine for integration testing without requiring the native runtime.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ModelConfig;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to load model: {0}")]
    LoadFailed(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Identifies the model an engine should load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier (e.g. "gemma-2b-it").
    pub model_id: String,

    /// Weights location on device storage, if the engine reads from disk.
    pub model_path: Option<PathBuf>,
}

impl From<&ModelConfig> for ModelDescriptor {
    fn from(cfg: &ModelConfig) -> Self {
        Self {
            model_id: cfg.model_id.clone(),
            model_path: cfg.model_path.clone(),
        }
    }
}

/// Sampling parameters for a single generation.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    /// Temperature (0.0 = greedy).
    pub temperature: f32,

    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// A model-loading engine.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Engine identifier for logs ("stub", "llama.cpp", ...).
    fn name(&self) -> &str;

    /// Load a model, returning a handle that can generate text.
    async fn load(&self, descriptor: &ModelDescriptor)
        -> Result<Arc<dyn ModelHandle>, EngineError>;
}

/// A loaded model capable of generation.
#[async_trait]
pub trait ModelHandle: Send + Sync + std::fmt::Debug {
    /// Identifier of the loaded model.
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn infer(&self, prompt: &str, params: &SamplingParams) -> Result<String, EngineError>;
}

/// Stand-in engine.
///
/// Load validates the descriptor (the weights file must exist when a path is
/// given); infer emits deterministic token-shaped text. A real binding
/// replaces this behind the same traits. [`StubEngine::failing`] builds an
/// engine whose loads fail, keeping the supervisor-visible failure path
/// exercisable end to end.
pub struct StubEngine {
    load_failure: Option<String>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self { load_failure: None }
    }

    /// An engine whose every load fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            load_failure: Some(message.into()),
        }
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct StubHandle {
    model_id: String,
}

#[async_trait]
impl InferenceBackend for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn load(
        &self,
        descriptor: &ModelDescriptor,
    ) -> Result<Arc<dyn ModelHandle>, EngineError> {
        if let Some(message) = &self.load_failure {
            return Err(EngineError::LoadFailed(message.clone()));
        }

        if let Some(path) = &descriptor.model_path {
            if !path.exists() {
                return Err(EngineError::LoadFailed(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        debug!(model = descriptor.model_id, "Stub engine loaded model");

        Ok(Arc::new(StubHandle {
            model_id: descriptor.model_id.clone(),
        }))
    }
}

#[async_trait]
impl ModelHandle for StubHandle {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn infer(&self, prompt: &str, params: &SamplingParams) -> Result<String, EngineError> {
        // Stub: ~1 token per 4 prompt characters, capped by max_tokens.
        let n_tokens = (prompt.len() / 4).max(1).min(params.max_tokens as usize);
        let words: Vec<String> = (0..n_tokens).map(|i| format!("token_{i}")).collect();
        Ok(words.join(" "))
    }
}
