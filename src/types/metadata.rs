//! Model descriptor exposed for introspection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ModelConfig;
use crate::types::analysis::AnalysisResult;
use crate::types::connection::ConnectionRecord;

/// Model creation time, 2025-01-01T00:00:00Z
const CREATED_AT_SECS: i64 = 1_735_689_600;

/// Static description of the active classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    /// Model version (semver)
    pub version: String,
    pub model_id: String,
    /// ML framework backing the active classifier
    pub framework: String,
    pub framework_version: String,
    /// JSON schema of accepted connection records
    pub input_schema: serde_json::Value,
    /// JSON schema of returned analysis results
    pub output_schema: serde_json::Value,
    pub description: String,
    pub author: String,
    pub license: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed every time the descriptor is queried
    pub last_updated: DateTime<Utc>,
    pub performance_metrics: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl ModelMetadata {
    /// Build the descriptor from configuration and the active framework
    pub fn from_config(config: &ModelConfig, framework: &str, framework_version: &str) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            model_id: config.model_id.clone(),
            framework: framework.to_string(),
            framework_version: framework_version.to_string(),
            input_schema: ConnectionRecord::schema(),
            output_schema: AnalysisResult::schema(),
            description: config.description.clone(),
            author: config.author.clone(),
            license: config.license.clone(),
            created_at: DateTime::from_timestamp(CREATED_AT_SECS, 0).unwrap_or_default(),
            last_updated: Utc::now(),
            performance_metrics: config.performance_metrics.clone(),
            documentation_url: config.documentation_url.clone(),
        }
    }
}
