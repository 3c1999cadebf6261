//! Prediction and analysis result data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;

/// Label assigned to benign traffic
pub const BENIGN: u8 = 0;
/// Label assigned to threatening traffic
pub const THREAT: u8 = 1;

/// Minimum threat confidence classified as critical
pub const CRITICAL_CONFIDENCE: f64 = 0.9;
/// Minimum threat confidence classified as high
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// Binary classifier output with its confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 0 = benign, 1 = threat
    pub label: u8,
    /// Confidence in the label, always within [0, 1]
    pub confidence: f64,
}

impl PredictionResult {
    /// Result substituted when the classifier fails
    pub const FALLBACK: PredictionResult = PredictionResult {
        label: BENIGN,
        confidence: 0.5,
    };

    /// Create a prediction, clamping confidence into [0, 1]
    pub fn new(label: u8, confidence: f64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_threat(&self) -> bool {
        self.label == THREAT
    }
}

/// Risk level classification, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from a prediction.
    ///
    /// Benign predictions are always low; threat predictions are bucketed by
    /// confidence against [`CRITICAL_CONFIDENCE`] and [`HIGH_CONFIDENCE`].
    pub fn assess(prediction: &PredictionResult) -> Self {
        if !prediction.is_threat() {
            return RiskLevel::Low;
        }

        if prediction.confidence >= CRITICAL_CONFIDENCE {
            RiskLevel::Critical
        } else if prediction.confidence >= HIGH_CONFIDENCE {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threat analysis returned for a connection record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Request identifier echoed from the input record
    pub request_id: String,

    /// Response timestamp
    pub timestamp: DateTime<Utc>,

    /// Model prediction (0: benign, 1: threat)
    pub prediction: u8,

    /// Prediction confidence (0.0 - 1.0)
    pub confidence: f64,

    /// Risk level classification
    pub risk_level: RiskLevel,

    /// Human-readable explanation
    pub explanation: String,

    /// Threat indicators that contributed to the explanation
    pub indicators: Vec<String>,

    /// Inference metadata (latency, model version, environment)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AnalysisResult {
    /// JSON schema of the returned wire format
    pub fn schema() -> serde_json::Value {
        json!({
            "title": "AnalysisResult",
            "type": "object",
            "properties": {
                "request_id": {"type": "string"},
                "timestamp": {"type": "string", "format": "date-time"},
                "prediction": {"type": "integer", "enum": [BENIGN, THREAT]},
                "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                "risk_level": {"type": "string", "enum": ["low", "medium", "high", "critical"]},
                "explanation": {"type": "string"},
                "indicators": {"type": "array", "items": {"type": "string"}},
                "metadata": {"type": "object"}
            },
            "required": [
                "request_id", "timestamp", "prediction", "confidence",
                "risk_level", "explanation", "indicators", "metadata"
            ]
        })
    }

    /// Inference latency reported in the metadata, if present
    pub fn inference_time_ms(&self) -> Option<f64> {
        self.metadata
            .get("inference_time_ms")
            .and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_is_always_low() {
        for confidence in [0.0, 0.5, 0.7, 0.9, 1.0] {
            let prediction = PredictionResult::new(BENIGN, confidence);
            assert_eq!(RiskLevel::assess(&prediction), RiskLevel::Low);
        }
    }

    #[test]
    fn test_threat_boundaries() {
        let assess = |c| RiskLevel::assess(&PredictionResult::new(THREAT, c));

        assert_eq!(assess(0.9), RiskLevel::Critical);
        assert_eq!(assess(0.95), RiskLevel::Critical);
        assert_eq!(assess(0.7), RiskLevel::High);
        assert_eq!(assess(0.8999), RiskLevel::High);
        assert_eq!(assess(0.6999), RiskLevel::Medium);
        assert_eq!(assess(0.0), RiskLevel::Medium);
    }

    #[test]
    fn test_assess_is_deterministic() {
        let prediction = PredictionResult::new(THREAT, 0.75);
        let first = RiskLevel::assess(&prediction);
        for _ in 0..10 {
            assert_eq!(RiskLevel::assess(&prediction), first);
        }
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(PredictionResult::new(THREAT, 1.7).confidence, 1.0);
        assert_eq!(PredictionResult::new(THREAT, -0.2).confidence, 0.0);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_analysis_result_serialization() {
        let mut metadata = HashMap::new();
        metadata.insert("inference_time_ms".to_string(), serde_json::json!(1.25));
        metadata.insert("model_version".to_string(), serde_json::json!("1.0.0"));

        let result = AnalysisResult {
            request_id: "req_1".to_string(),
            timestamp: Utc::now(),
            prediction: THREAT,
            confidence: 0.95,
            risk_level: RiskLevel::Critical,
            explanation: "Possible CRITICAL threat detected.".to_string(),
            indicators: vec!["SYN packet without ACK (possible port scan)".to_string()],
            metadata,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["risk_level"], "critical");
        assert_eq!(json["prediction"], 1);

        let deserialized: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized.request_id, result.request_id);
        assert_eq!(deserialized.inference_time_ms(), Some(1.25));
    }
}
