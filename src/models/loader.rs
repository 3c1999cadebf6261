//! Classifier loader with fallback to an in-process ensemble

use crate::config::ModelConfig;
use crate::models::classifier::{Classifier, ClassifierError};
use crate::models::forest::{ForestParams, RandomForest};
use crate::models::onnx::OnnxClassifier;
use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

static SHARED_CLASSIFIER: OnceLock<Arc<ClassifierSource>> = OnceLock::new();

/// The classifier actually serving predictions
pub enum ClassifierSource {
    /// Trained artifact loaded from disk
    Loaded(OnnxClassifier),
    /// Synthetic ensemble built because no usable artifact was found
    Fallback(RandomForest),
}

impl ClassifierSource {
    /// True when serving from the synthetic fallback ensemble
    pub fn is_degraded(&self) -> bool {
        matches!(self, ClassifierSource::Fallback(_))
    }

    /// Framework name and version for the model descriptor
    pub fn framework(&self) -> (&'static str, &'static str) {
        match self {
            ClassifierSource::Loaded(_) => ("onnxruntime", "2.0.0-rc.10"),
            ClassifierSource::Fallback(_) => ("linfa-trees", "0.7"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierSource::Loaded(_) => "onnx",
            ClassifierSource::Fallback(_) => "fallback_forest",
        }
    }
}

impl Classifier for ClassifierSource {
    fn predict(&self, features: &[f32]) -> Result<i64, ClassifierError> {
        match self {
            ClassifierSource::Loaded(model) => model.predict(features),
            ClassifierSource::Fallback(model) => model.predict(features),
        }
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>, ClassifierError> {
        match self {
            ClassifierSource::Loaded(model) => model.predict_proba(features),
            ClassifierSource::Fallback(model) => model.predict_proba(features),
        }
    }

    fn predict_with_proba(
        &self,
        features: &[f32],
    ) -> Result<(i64, Option<Vec<f64>>), ClassifierError> {
        match self {
            ClassifierSource::Loaded(model) => model.predict_with_proba(features),
            ClassifierSource::Fallback(model) => model.predict_with_proba(features),
        }
    }
}

/// Loader resolving the configured artifact into a classifier
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    forest_params: ForestParams,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
            forest_params: ForestParams::default(),
        }
    }

    pub fn with_forest_params(mut self, params: ForestParams) -> Self {
        self.forest_params = params;
        self
    }

    /// Load the classifier at `path`, falling back to a synthetic ensemble.
    ///
    /// Fails only when the fallback ensemble itself cannot be trained.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ClassifierSource> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(
                path = %path.display(),
                "Model file not found, running in degraded mode with fallback ensemble"
            );
            return self.fallback();
        }

        match OnnxClassifier::load(path, self.onnx_threads) {
            Ok(model) => {
                info!(path = %path.display(), "Model loaded successfully");
                Ok(ClassifierSource::Loaded(model))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load model");
                warn!("Running in degraded mode with fallback ensemble");
                self.fallback()
            }
        }
    }

    /// Load the process-wide classifier exactly once.
    ///
    /// Later calls return the already loaded instance regardless of `config`.
    pub fn shared(config: &ModelConfig) -> Result<Arc<ClassifierSource>> {
        if let Some(source) = SHARED_CLASSIFIER.get() {
            return Ok(Arc::clone(source));
        }

        let source = Arc::new(Self::with_threads(config.onnx_threads).load(&config.path)?);
        // A concurrent initializer may have won; keep whichever was stored first.
        Ok(Arc::clone(SHARED_CLASSIFIER.get_or_init(|| source)))
    }

    fn fallback(&self) -> Result<ClassifierSource> {
        let forest = RandomForest::train_synthetic(&self.forest_params)?;
        warn!(
            trees = forest.n_trees(),
            features = forest.n_features(),
            "Using fallback decision tree ensemble"
        );
        Ok(ClassifierSource::Fallback(forest))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_model_falls_back() {
        let loader = ModelLoader::new();

        let source = loader.load("models/definitely_missing.onnx").unwrap();

        assert!(source.is_degraded());
        assert_eq!(source.kind(), "fallback_forest");
        assert_eq!(source.framework().0, "linfa-trees");
    }

    #[test]
    fn test_corrupt_model_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not an onnx graph").unwrap();

        let source = ModelLoader::new().load(file.path()).unwrap();

        assert!(source.is_degraded());
    }

    #[test]
    fn test_fallback_serves_predictions() {
        let source = ModelLoader::new().load("missing.onnx").unwrap();
        let features = [54321.0f32, 22.0, 0.0, 128.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        let label = source.predict(&features).unwrap();
        let proba = source.predict_proba(&features).unwrap().unwrap();

        assert!(label == 0 || label == 1);
        assert_eq!(proba.len(), 2);
    }

    #[test]
    fn test_shared_classifier_is_initialized_once() {
        let config = ModelConfig {
            path: "missing.onnx".to_string(),
            ..ModelConfig::default()
        };

        let first = ModelLoader::shared(&config).unwrap();
        let second = ModelLoader::shared(&config).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }
}
