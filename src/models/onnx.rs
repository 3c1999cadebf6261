//! ONNX Runtime backed classifier

use crate::models::classifier::{Classifier, ClassifierError};
use anyhow::{anyhow, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// Classifier running an exported scikit-learn style ONNX model.
///
/// `Session::run` needs exclusive access, so the session is locked for the
/// duration of a single prediction only.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    label_output: Option<String>,
    proba_output: Option<String>,
}

impl OnnxClassifier {
    /// Load a model from an ONNX file
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| anyhow!("Failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("Failed to set optimization level: {}", e))?
            .with_intra_threads(onnx_threads)
            .map_err(|e| anyhow!("Failed to set intra-op threads: {}", e))?
            .commit_from_file(path)
            .map_err(|e| anyhow!("{}", e))
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_output.is_none() && proba_output.is_none() {
            return Err(anyhow!(
                "model at {:?} exposes neither a label nor a probability output",
                path
            ));
        }

        info!(
            input = %input_name,
            label_output = ?label_output,
            proba_output = ?proba_output,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
        })
    }

    /// Run the session and extract the requested part of the output
    fn run<T>(
        &self,
        features: &[f32],
        extract: impl FnOnce(&SessionOutputs) -> Result<T, ClassifierError>,
    ) -> Result<T, ClassifierError> {
        // Input tensor shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| ClassifierError::Runtime(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        extract(&outputs)
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Result<Option<i64>, ClassifierError> {
        let Some(name) = self.label_output.as_deref() else {
            return Ok(None);
        };
        let output = outputs
            .get(name)
            .ok_or_else(|| ClassifierError::MissingOutput(name.to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        data.first()
            .copied()
            .map(Some)
            .ok_or_else(|| ClassifierError::MissingOutput(format!("{} is empty", name)))
    }

    /// Extract class probabilities.
    /// Handles both tensor outputs and seq(map) outputs (zipmap exports).
    fn extract_probabilities(
        &self,
        outputs: &SessionOutputs,
    ) -> Result<Option<Vec<f64>>, ClassifierError> {
        let Some(name) = self.proba_output.as_deref() else {
            return Ok(None);
        };
        let output = outputs
            .get(name)
            .ok_or_else(|| ClassifierError::MissingOutput(name.to_string()))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            // [batch, num_classes] or [num_classes]; batch size is always 1
            let num_classes = shape.last().copied().unwrap_or(0).max(0) as usize;
            let row: Vec<f64> = data.iter().take(num_classes).map(|&p| p as f64).collect();
            debug!(output = %name, probabilities = ?row, "Extracted from tensor");
            return Ok(Some(row));
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return extract_from_sequence_map(output).map(Some);
        }

        Err(ClassifierError::MissingOutput(format!(
            "unsupported probability output type for {}",
            name
        )))
    }
}

/// Extract probabilities from seq(map(int64, float)), ordered by class id
fn extract_from_sequence_map(output: &DynValue) -> Result<Vec<f64>, ClassifierError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| ClassifierError::Runtime(format!("Failed to downcast to sequence: {}", e)))?;

    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

    let map_value = maps
        .first()
        .ok_or_else(|| ClassifierError::MissingOutput("empty probability sequence".to_string()))?;

    let mut kv_pairs = map_value
        .try_extract_key_values::<i64, f32>()
        .map_err(|e| ClassifierError::Runtime(e.to_string()))?;
    kv_pairs.sort_by_key(|(class_id, _)| *class_id);

    debug!(probabilities = ?kv_pairs, "Extracted from seq(map)");

    Ok(kv_pairs.into_iter().map(|(_, p)| p as f64).collect())
}

fn argmax(probabilities: &[f64]) -> Option<i64> {
    probabilities
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx as i64)
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<i64, ClassifierError> {
        self.run(features, |outputs| {
            if let Some(label) = self.extract_label(outputs)? {
                return Ok(label);
            }
            self.extract_probabilities(outputs)?
                .as_deref()
                .and_then(argmax)
                .ok_or_else(|| ClassifierError::MissingOutput("no label output".to_string()))
        })
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>, ClassifierError> {
        if self.proba_output.is_none() {
            return Ok(None);
        }
        self.run(features, |outputs| self.extract_probabilities(outputs))
    }

    /// Single session run serving both label and probabilities
    fn predict_with_proba(
        &self,
        features: &[f32],
    ) -> Result<(i64, Option<Vec<f64>>), ClassifierError> {
        self.run(features, |outputs| {
            let probabilities = self.extract_probabilities(outputs)?;
            let label = match self.extract_label(outputs)? {
                Some(label) => label,
                None => probabilities
                    .as_deref()
                    .and_then(argmax)
                    .ok_or_else(|| ClassifierError::MissingOutput("no label output".to_string()))?,
            };
            Ok((label, probabilities))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.2, 0.8]), Some(1));
        assert_eq!(argmax(&[0.9, 0.1]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = OnnxClassifier::load("does/not/exist.onnx", 1);
        assert!(result.is_err());
    }
}
