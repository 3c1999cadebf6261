//! Classifier capability and the confidence adapter built on top of it

use crate::types::analysis::{PredictionResult, BENIGN, THREAT};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised by an underlying classifier during prediction
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("model runtime error: {0}")]
    Runtime(String),
    #[error("model produced no usable output: {0}")]
    MissingOutput(String),
    #[error("unexpected class label {0}")]
    UnexpectedLabel(i64),
    #[error("invalid class probability {0}")]
    InvalidProbability(f64),
    #[error("classifier panicked: {0}")]
    Panicked(String),
}

/// A trained binary classifier.
///
/// `predict_proba` is optional; models without probability estimates keep the
/// default implementation returning `Ok(None)`.
pub trait Classifier: Send + Sync {
    /// Predict the class label for a single sample
    fn predict(&self, features: &[f32]) -> Result<i64, ClassifierError>;

    /// Per-class probabilities for a single sample, if supported
    fn predict_proba(&self, _features: &[f32]) -> Result<Option<Vec<f64>>, ClassifierError> {
        Ok(None)
    }

    /// Label and probabilities together.
    ///
    /// Backends that produce both from one evaluation should override this.
    fn predict_with_proba(
        &self,
        features: &[f32],
    ) -> Result<(i64, Option<Vec<f64>>), ClassifierError> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn predict(&self, features: &[f32]) -> Result<i64, ClassifierError> {
        (**self).predict(features)
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>, ClassifierError> {
        (**self).predict_proba(features)
    }

    fn predict_with_proba(
        &self,
        features: &[f32],
    ) -> Result<(i64, Option<Vec<f64>>), ClassifierError> {
        (**self).predict_with_proba(features)
    }
}

/// Wraps a classifier with a uniform predict-with-confidence contract.
///
/// Never fails: classifier errors and panics are logged and replaced with
/// [`PredictionResult::FALLBACK`].
pub struct ClassifierAdapter<C> {
    classifier: C,
    fallbacks: AtomicU64,
}

impl<C: Classifier> ClassifierAdapter<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Predict a label and its confidence for a feature vector.
    ///
    /// Confidence is the highest class probability when the model supports
    /// probabilities, 1.0 otherwise. A 1.0 from a model without probability
    /// support carries no information about certainty.
    pub fn predict_with_confidence(&self, features: &[f32]) -> PredictionResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_predict(features)))
            .unwrap_or_else(|payload| Err(ClassifierError::Panicked(panic_message(payload))));

        match outcome {
            Ok(result) => {
                debug!(
                    label = result.label,
                    confidence = result.confidence,
                    "Classifier prediction complete"
                );
                result
            }
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                error!(
                    error = %e,
                    feature_count = features.len(),
                    "Classifier prediction failed, returning benign fallback"
                );
                PredictionResult::FALLBACK
            }
        }
    }

    fn try_predict(&self, features: &[f32]) -> Result<PredictionResult, ClassifierError> {
        let (label, probabilities) = self.classifier.predict_with_proba(features)?;
        let label = match label {
            0 => BENIGN,
            1 => THREAT,
            other => return Err(ClassifierError::UnexpectedLabel(other)),
        };

        let confidence = match probabilities {
            Some(probabilities) => max_probability(&probabilities)?,
            None => 1.0,
        };

        Ok(PredictionResult::new(label, confidence))
    }

    /// Number of predictions replaced by the fallback result
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn max_probability(probabilities: &[f64]) -> Result<f64, ClassifierError> {
    let mut max: Option<f64> = None;
    for &p in probabilities {
        if !p.is_finite() {
            return Err(ClassifierError::InvalidProbability(p));
        }
        max = Some(max.map_or(p, |m| m.max(p)));
    }
    max.ok_or_else(|| ClassifierError::MissingOutput("empty probability vector".to_string()))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_confidence_is_max_probability() {
        let adapter = ClassifierAdapter::new(FixedClassifier::with_confidence(1, 0.95));

        let result = adapter.predict_with_confidence(&[0.0; 10]);

        assert_eq!(result.label, THREAT);
        assert!((result.confidence - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_missing_probability_support_defaults_to_full_confidence() {
        let adapter = ClassifierAdapter::new(FixedClassifier::without_probabilities(1));

        let result = adapter.predict_with_confidence(&[0.0; 4]);

        assert_eq!(result.label, THREAT);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_failing_classifier_returns_fallback() {
        let adapter = ClassifierAdapter::new(FailingClassifier);

        for _ in 0..3 {
            let result = adapter.predict_with_confidence(&[1.0, 2.0, 3.0, 4.0]);
            assert_eq!(result, PredictionResult::FALLBACK);
            assert_eq!(result.label, 0);
            assert_eq!(result.confidence, 0.5);
        }
        assert_eq!(adapter.fallback_count(), 3);
    }

    #[test]
    fn test_panicking_classifier_returns_fallback() {
        let adapter = ClassifierAdapter::new(PanickingClassifier);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            adapter.predict_with_confidence(&[0.0; 4])
        }));

        assert_eq!(result.ok(), Some(PredictionResult::FALLBACK));
        assert_eq!(adapter.fallback_count(), 1);
    }

    #[test]
    fn test_combined_prediction_defaults_to_both_calls() {
        let classifier = FixedClassifier::with_confidence(1, 0.8);

        let (label, probabilities) = classifier.predict_with_proba(&[0.0; 4]).unwrap();

        assert_eq!(label, 1);
        assert_eq!(probabilities, Some(vec![1.0 - 0.8, 0.8]));
    }

    /// Counts model evaluations; label and probabilities come from one run
    struct SingleRunClassifier {
        runs: AtomicU64,
    }

    impl Classifier for SingleRunClassifier {
        fn predict(&self, _features: &[f32]) -> Result<i64, ClassifierError> {
            self.runs.fetch_add(1, Ordering::Relaxed);
            Ok(1)
        }

        fn predict_proba(&self, _features: &[f32]) -> Result<Option<Vec<f64>>, ClassifierError> {
            self.runs.fetch_add(1, Ordering::Relaxed);
            Ok(Some(vec![0.25, 0.75]))
        }

        fn predict_with_proba(
            &self,
            _features: &[f32],
        ) -> Result<(i64, Option<Vec<f64>>), ClassifierError> {
            self.runs.fetch_add(1, Ordering::Relaxed);
            Ok((1, Some(vec![0.25, 0.75])))
        }
    }

    #[test]
    fn test_adapter_evaluates_model_once() {
        let adapter = ClassifierAdapter::new(SingleRunClassifier {
            runs: AtomicU64::new(0),
        });

        let result = adapter.predict_with_confidence(&[0.0; 10]);

        assert_eq!(result.label, THREAT);
        assert_eq!(result.confidence, 0.75);
        assert_eq!(adapter.classifier.runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unexpected_label_falls_back() {
        let adapter = ClassifierAdapter::new(FixedClassifier::without_probabilities(7));

        assert_eq!(
            adapter.predict_with_confidence(&[0.0; 4]),
            PredictionResult::FALLBACK
        );
    }

    #[test]
    fn test_non_finite_probability_falls_back() {
        let adapter = ClassifierAdapter::new(FixedClassifier {
            label: 1,
            probabilities: Some(vec![f64::NAN, 0.4]),
        });

        assert_eq!(
            adapter.predict_with_confidence(&[0.0; 4]),
            PredictionResult::FALLBACK
        );
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let adapter = ClassifierAdapter::new(FixedClassifier {
            label: 1,
            probabilities: Some(vec![-0.1, 1.1]),
        });

        assert_eq!(adapter.predict_with_confidence(&[0.0; 4]).confidence, 1.0);
    }
}
