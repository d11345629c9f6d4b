//! Supervisor-driven start/stop sequences over the full stack.
//!
//! These tests stand in for the process supervisor: they issue the two
//! lifecycle commands and observe the gateway from the outside, the way a
//! user-facing status indicator and LAN clients would.

use std::sync::Arc;

use serde_json::{json, Value};

use edge_llm_gateway::config::Config;
use edge_llm_gateway::inference::backend::StubEngine;
use edge_llm_gateway::inference::coordinator::InferenceCoordinator;
use edge_llm_gateway::lifecycle::{LifecycleController, LifecyclePhase};
use edge_llm_gateway::server::gateway::GatewayServer;

struct Harness {
    controller: LifecycleController,
    gateway: Arc<GatewayServer>,
}

fn harness_with(engine: StubEngine) -> Harness {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    let config = Arc::new(config);

    let coordinator = Arc::new(InferenceCoordinator::new(Arc::new(engine), config.clone()));
    let gateway = Arc::new(GatewayServer::new(coordinator.clone(), config.clone()));
    let controller = LifecycleController::new(coordinator, gateway.clone(), config);
    Harness {
        controller,
        gateway,
    }
}

#[tokio::test]
async fn test_full_lifecycle_serves_and_stops() {
    let harness = harness_with(StubEngine::new());

    harness.controller.handle_start().await.unwrap();
    assert_eq!(harness.controller.phase(), LifecyclePhase::Running);

    let addr = harness.gateway.local_addr().await.unwrap();
    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let models: Value = client
        .get(format!("{base}/v1/models"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(models["loaded"], true);
    assert_eq!(models["model"], "gemma-2b-it");

    let resp = client
        .post(format!("{base}/v1/chat/completions"))
        .json(&json!({"prompt": "Say hello", "temperature": 0.7, "max_tokens": 50}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "gemma-2b-it");
    assert!(body["processing_time_ms"].as_u64().is_some());

    harness.controller.handle_stop().await;
    assert_eq!(harness.controller.phase(), LifecyclePhase::Idle);

    // The socket is gone; new connections are refused.
    assert!(client
        .get(format!("{base}/health"))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_status_string_names_model_and_port() {
    let harness = harness_with(StubEngine::new());

    harness.controller.handle_start().await.unwrap();
    let addr = harness.gateway.local_addr().await.unwrap();

    let status = harness.controller.status_string();
    assert!(status.contains("gemma-2b-it"));
    assert!(status.contains(&addr.port().to_string()));

    harness.controller.handle_stop().await;
}

#[tokio::test]
async fn test_failed_load_never_opens_the_socket() {
    let harness = harness_with(StubEngine::failing("engine init failed"));

    harness.controller.handle_start().await.unwrap_err();
    assert_eq!(harness.controller.phase(), LifecyclePhase::Failed);
    assert!(harness
        .controller
        .status_string()
        .contains("engine init failed"));
    assert!(!harness.gateway.is_listening().await);
}

#[tokio::test]
async fn test_bind_failure_goes_to_failed() {
    // Occupy a port so the gateway's bind loses the race.
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken_port = blocker.local_addr().unwrap().port();

    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = taken_port;
    let config = Arc::new(config);

    let coordinator = Arc::new(InferenceCoordinator::new(
        Arc::new(StubEngine::new()),
        config.clone(),
    ));
    let gateway = Arc::new(GatewayServer::new(coordinator.clone(), config.clone()));
    let controller = LifecycleController::new(coordinator, gateway.clone(), config);

    controller.handle_start().await.unwrap_err();
    assert_eq!(controller.phase(), LifecyclePhase::Failed);
    assert!(controller.status_string().contains("failed to start gateway"));
    assert!(!gateway.is_listening().await);
}

#[tokio::test]
async fn test_stop_twice_then_restart() {
    let harness = harness_with(StubEngine::new());

    harness.controller.handle_start().await.unwrap();
    harness.controller.handle_stop().await;
    // Second stop is a no-op, not an error.
    harness.controller.handle_stop().await;
    assert_eq!(harness.controller.phase(), LifecyclePhase::Idle);

    // A fresh start works after a full stop.
    harness.controller.handle_start().await.unwrap();
    assert_eq!(harness.controller.phase(), LifecyclePhase::Running);

    let addr = harness.gateway.local_addr().await.unwrap();
    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    harness.controller.handle_stop().await;
}
