//! Inference engine orchestrating the threat analysis pipeline

use crate::config::AppConfig;
use crate::explanation;
use crate::feature_extractor::FeatureExtractor;
use crate::models::classifier::{Classifier, ClassifierAdapter};
use crate::models::loader::ClassifierSource;
use crate::types::analysis::{AnalysisResult, RiskLevel};
use crate::types::connection::ConnectionRecord;
use crate::types::metadata::ModelMetadata;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Failures surfaced to the transport layer
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis of request {request_id} failed during {stage}: {message}")]
    Internal {
        request_id: String,
        stage: &'static str,
        message: String,
    },
}

impl AnalysisError {
    pub fn request_id(&self) -> &str {
        match self {
            AnalysisError::Internal { request_id, .. } => request_id,
        }
    }
}

/// Threat inference engine.
///
/// Runs extract → predict → assess → explain for each record. Holds the
/// shared classifier read-only; concurrent calls need no coordination.
pub struct InferenceEngine {
    extractor: FeatureExtractor,
    adapter: ClassifierAdapter<Arc<dyn Classifier>>,
    metadata: RwLock<ModelMetadata>,
    environment: String,
}

impl InferenceEngine {
    /// Create an engine around the loaded classifier source
    pub fn new(source: Arc<ClassifierSource>, config: &AppConfig) -> Self {
        let (framework, framework_version) = source.framework();
        let metadata = ModelMetadata::from_config(&config.model, framework, framework_version);

        info!(
            model = %metadata.name,
            version = %metadata.version,
            source = source.kind(),
            degraded = source.is_degraded(),
            "Inference engine initialized"
        );

        Self::with_classifier(source, metadata, config.server.environment.clone())
    }

    /// Create an engine around any classifier implementation
    pub fn with_classifier(
        classifier: Arc<dyn Classifier>,
        metadata: ModelMetadata,
        environment: String,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            adapter: ClassifierAdapter::new(classifier),
            metadata: RwLock::new(metadata),
            environment,
        }
    }

    /// Analyze a connection record.
    ///
    /// Classifier failures are absorbed by the adapter; the request id is
    /// taken from the record unchanged.
    pub fn analyze(&self, record: &ConnectionRecord) -> AnalysisResult {
        let start_time = Instant::now();

        let features = self.extractor.extract(record);
        let prediction = self.adapter.predict_with_confidence(&features);
        let risk_level = RiskLevel::assess(&prediction);
        let (explanation, indicators) = explanation::explain(record, &prediction, risk_level);

        let inference_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        debug!(
            request_id = %record.request_id,
            feature_count = features.len(),
            prediction = prediction.label,
            confidence = prediction.confidence,
            risk_level = %risk_level,
            inference_time_ms = inference_time_ms,
            "Analysis complete"
        );

        let mut metadata = HashMap::new();
        metadata.insert("inference_time_ms".to_string(), json!(inference_time_ms));
        metadata.insert("model_version".to_string(), json!(self.model_version()));
        metadata.insert("environment".to_string(), json!(self.environment));

        AnalysisResult {
            request_id: record.request_id.clone(),
            timestamp: Utc::now(),
            prediction: prediction.label,
            confidence: prediction.confidence,
            risk_level,
            explanation,
            indicators,
            metadata,
        }
    }

    /// Model descriptor, with `last_updated` refreshed to now
    pub fn model_info(&self) -> ModelMetadata {
        let mut metadata = self.metadata.write();
        metadata.last_updated = Utc::now();
        metadata.clone()
    }

    pub fn model_version(&self) -> String {
        self.metadata.read().version.clone()
    }

    pub fn model_name(&self) -> String {
        self.metadata.read().name.clone()
    }

    /// Predictions replaced by the benign fallback since startup
    pub fn classifier_fallbacks(&self) -> u64 {
        self.adapter.fallback_count()
    }
}
