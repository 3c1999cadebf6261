//! Decision tree ensemble used when no trained artifact is available

use crate::models::classifier::{Classifier, ClassifierError};
use anyhow::{anyhow, Result};
use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Training parameters for the fallback ensemble
#[derive(Debug, Clone)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Number of synthetic training rows
    pub n_samples: usize,
    /// Number of features per row
    pub n_features: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Seed for synthetic data and bootstrap sampling
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 10,
            n_samples: 100,
            n_features: 10,
            max_depth: 6,
            seed: 42,
        }
    }
}

/// Bagged ensemble of decision trees with majority voting
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

impl RandomForest {
    /// Fit an ensemble on seeded synthetic data.
    ///
    /// The target is a noisy linear rule over the first three features, so
    /// the trees learn a real decision boundary rather than pure noise.
    pub fn train_synthetic(params: &ForestParams) -> Result<Self> {
        if params.n_trees == 0 || params.n_samples == 0 || params.n_features < 3 {
            return Err(anyhow!("invalid forest parameters: {:?}", params));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let (records, targets) = synthetic_dataset(params, &mut rng);

        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let indices: Vec<usize> = (0..params.n_samples)
                .map(|_| rng.gen_range(0..params.n_samples))
                .collect();
            let sample = Dataset::new(
                records.select(Axis(0), &indices),
                targets.select(Axis(0), &indices),
            );

            let tree = DecisionTree::<f64, usize>::params()
                .max_depth(Some(params.max_depth))
                .fit(&sample)
                .map_err(|e| anyhow!("failed to fit decision tree: {}", e))?;
            trees.push(tree);
        }

        info!(
            trees = trees.len(),
            samples = params.n_samples,
            features = params.n_features,
            "Trained synthetic decision tree ensemble"
        );

        Ok(Self {
            trees,
            n_features: params.n_features,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fraction of trees voting for each class (index 0 benign, 1 threat)
    fn votes(&self, features: &[f32]) -> Result<[f64; 2], ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::FeatureMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let sample = Array2::from_shape_vec(
            (1, self.n_features),
            features.iter().map(|&f| f as f64).collect(),
        )
        .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        let mut counts = [0usize; 2];
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(&sample);
            match predicted.first() {
                Some(&class) if class < counts.len() => counts[class] += 1,
                Some(&class) => return Err(ClassifierError::UnexpectedLabel(class as i64)),
                None => {
                    return Err(ClassifierError::MissingOutput(
                        "tree produced no prediction".to_string(),
                    ))
                }
            }
        }

        let total = self.trees.len() as f64;
        Ok([counts[0] as f64 / total, counts[1] as f64 / total])
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &[f32]) -> Result<i64, ClassifierError> {
        Ok(majority(self.votes(features)?))
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<Vec<f64>>, ClassifierError> {
        Ok(Some(self.votes(features)?.to_vec()))
    }

    fn predict_with_proba(
        &self,
        features: &[f32],
    ) -> Result<(i64, Option<Vec<f64>>), ClassifierError> {
        let votes = self.votes(features)?;
        Ok((majority(votes), Some(votes.to_vec())))
    }
}

fn majority([benign, threat]: [f64; 2]) -> i64 {
    if threat > benign {
        1
    } else {
        0
    }
}

fn synthetic_dataset(params: &ForestParams, rng: &mut StdRng) -> (Array2<f64>, Array1<usize>) {
    let records = Array2::from_shape_fn((params.n_samples, params.n_features), |_| {
        rng.gen_range(-3.0..3.0)
    });

    let targets = records
        .rows()
        .into_iter()
        .map(|row| {
            let noise: f64 = rng.gen_range(-0.5..0.5);
            usize::from(row[0] + row[1] - row[2] + noise > 0.0)
        })
        .collect::<Array1<usize>>();

    (records, targets)
}
