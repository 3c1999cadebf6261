//! ML model inference components

pub mod classifier;
pub mod forest;
pub mod inference;
pub mod loader;
pub mod onnx;

pub use classifier::{Classifier, ClassifierAdapter, ClassifierError};
pub use inference::{AnalysisError, InferenceEngine};
pub use loader::{ClassifierSource, ModelLoader};
