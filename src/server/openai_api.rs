//! OpenAI-compatible HTTP API.
//!
//! Routes:
//! - POST /v1/chat/completions
//! - GET /v1/models
//! - GET /health

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::inference::coordinator::InferenceCoordinator;

/// Application state shared across handlers.
pub struct AppState {
    pub coordinator: Arc<InferenceCoordinator>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Open, trust-the-LAN CORS: any origin, Content-Type allowed.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(model_status))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Chat completion request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Accepted for client compatibility; responses are always whole.
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}

/// Chat completion response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub processing_time_ms: u64,
}

/// Error response; `code` mirrors the HTTP status sent.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Model status response.
#[derive(Debug, Serialize)]
pub struct ModelStatusResponse {
    pub loaded: bool,
    pub model: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

/// Liveness only; reports ok whether or not a model is loaded, so the
/// supervisor can tell "process alive" from "model ready".
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn model_status(State(state): State<Arc<AppState>>) -> Json<ModelStatusResponse> {
    let status = state.coordinator.status();
    Json(ModelStatusResponse {
        loaded: status.loaded,
        model: status.model,
    })
}

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            debug!(request_id, "Rejected malformed request body");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid request body: {}", rejection.body_text()),
            );
        }
    };

    info!(
        request_id,
        temperature = req.temperature,
        max_tokens = req.max_tokens,
        stream = req.stream,
        "Chat completion request"
    );

    let started = Instant::now();
    match state
        .coordinator
        .generate(&req.prompt, req.temperature, req.max_tokens)
        .await
    {
        Ok(generation) => {
            let processing_time_ms = started.elapsed().as_millis() as u64;
            info!(
                request_id,
                model = generation.model,
                processing_time_ms,
                engine_ms = generation.engine_time.as_millis() as u64,
                "Chat completion done"
            );
            (
                StatusCode::OK,
                Json(ChatResponse {
                    response: generation.text,
                    model: generation.model,
                    processing_time_ms,
                }),
            )
                .into_response()
        }
        Err(e) => {
            info!(request_id, error = %e, "Chat completion failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        }),
    )
        .into_response()
}
