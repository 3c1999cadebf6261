//! Threat Detection Service Library
//!
//! Classifies network connection descriptions as benign or threatening
//! using an ONNX model, with a seeded tree ensemble as degraded fallback,
//! and explains each verdict with a risk tier and rule-based indicators.

pub mod api;
pub mod config;
pub mod explanation;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use types::{AnalysisResult, ConnectionRecord, RiskLevel};
