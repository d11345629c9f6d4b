//! Runtime configuration for edge-llm-gateway.
//!
//! Configuration is loaded from a JSON file or constructed programmatically;
//! CLI flags override file values. All server and sampling knobs live here.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "edge-llm-gateway", about = "Device-local OpenAI-compatible LLM gateway")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen port (overrides the config file).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Model identifier to load at startup (overrides the config file).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Model settings.
    pub model: ModelConfig,

    /// Sampling parameter limits.
    pub limits: LimitsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0").
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Grace window for draining in-flight requests on stop, in milliseconds.
    pub shutdown_grace_ms: u64,

    /// Maximum generations running against the engine at once.
    ///
    /// The engine is not assumed safe for concurrent generation, so the
    /// default is 1: requests queue and run one at a time. Raise only for
    /// engines known to tolerate concurrent calls.
    pub max_concurrent_generations: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_grace_ms: 2000,
            max_concurrent_generations: 1,
        }
    }
}

/// Model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Identifier of the model served at startup.
    pub model_id: String,

    /// Path to the model weights on device storage, if the engine needs one.
    pub model_path: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "gemma-2b-it".to_string(),
            model_path: None,
        }
    }
}

/// Accepted sampling parameter ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Lowest accepted temperature.
    pub temperature_min: f32,

    /// Highest accepted temperature.
    pub temperature_max: f32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            temperature_min: 0.0,
            temperature_max: 2.0,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply CLI overrides on top of file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(model) = &cli.model {
            self.model.model_id = model.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.max_concurrent_generations, 1);
        assert_eq!(cfg.model.model_id, "gemma-2b-it");
        assert_eq!(cfg.limits.temperature_max, 2.0);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let cfg = Config::load(std::path::Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 9090}}}}"#).unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        // Unspecified sections keep their defaults.
        assert_eq!(cfg.model.model_id, "gemma-2b-it");
        assert_eq!(cfg.server.shutdown_grace_ms, 2000);
    }

    #[test]
    fn test_cli_overrides() {
        let mut cfg = Config::default();
        let cli = Cli {
            config: PathBuf::from("config.json"),
            port: Some(8123),
            model: Some("phi-2".to_string()),
            verbose: false,
        };
        cfg.apply_cli(&cli);
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.model.model_id, "phi-2");
    }
}
