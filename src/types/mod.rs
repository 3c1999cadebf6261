//! Type definitions for the threat detection service

pub mod analysis;
pub mod connection;
pub mod metadata;

pub use analysis::{AnalysisResult, PredictionResult, RiskLevel};
pub use connection::{ConnectionRecord, Protocol};
pub use metadata::ModelMetadata;
