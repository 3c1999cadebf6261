//! Configuration management for the threat detection service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Deployment environment (development, staging, production)
    pub environment: String,
    /// Accepted values for the X-API-Key header
    pub api_keys: Vec<String>,
    /// Upper bound for a single analysis in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            api_keys: Vec::new(),
            request_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Requests are accepted without a key only in development with no keys configured
    pub fn auth_disabled(&self) -> bool {
        self.environment == "development" && self.api_keys.is_empty()
    }
}

/// Classifier artifact and descriptor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: String,
    pub name: String,
    pub version: String,
    pub model_id: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub documentation_url: Option<String>,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
    /// Offline evaluation metrics reported by the model descriptor
    pub performance_metrics: HashMap<String, f64>,
}

fn default_performance_metrics() -> HashMap<String, f64> {
    let mut metrics = HashMap::new();
    metrics.insert("accuracy".to_string(), 0.987);
    metrics.insert("precision".to_string(), 0.983);
    metrics.insert("recall".to_string(), 0.972);
    metrics.insert("f1_score".to_string(), 0.977);
    metrics.insert("inference_time_ms".to_string(), 5.2);
    metrics
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/threat_model.onnx".to_string(),
            name: "Red Sentinel Threat Detector".to_string(),
            version: "1.0.0".to_string(),
            model_id: "red-sentinel-threat-v1".to_string(),
            description: "Threat detection model for network traffic".to_string(),
            author: "Red Sentinel Team".to_string(),
            license: "MIT".to_string(),
            documentation_url: None,
            onnx_threads: 1,
            performance_metrics: default_performance_metrics(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (or `SENTINEL_CONFIG`) and environment
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; `SENTINEL__<SECTION>__<KEY>` environment
    /// variables override it.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.api_keys")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
