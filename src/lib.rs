//! edge-llm-gateway: device-local HTTP gateway for a single loaded LLM.
//!
//! Exposes one stateful inference resource (a loaded language model) to
//! LAN clients through an OpenAI-compatible chat-completion endpoint.
//! The process lifecycle (start/stop, model load/unload) is driven by an
//! external supervisor; see [`lifecycle::LifecycleController`].

pub mod config;
pub mod inference;
pub mod lifecycle;
pub mod net;
pub mod server;
