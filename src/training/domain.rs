//! Domain types for model training and the persisted artefact bundle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::error::{CardioError, CardioResult};
use crate::common::time;
use crate::evaluation::domain::EvalSuite;

use super::forest::RandomForest;
use super::scaler::StandardScaler;

/// How many candidate features each split looks at.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least one.
    #[default]
    Sqrt,
    /// Every feature at every split.
    All,
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
            MaxFeatures::All => n_features.max(1),
        }
    }
}

/// Random forest hyper-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Everything the trainer needs besides the dataset itself.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    /// Fraction of each class held out for evaluation.
    pub test_size: f64,
    pub split_seed: u64,
    pub forest: ForestConfig,
    /// How many ranked feature importances the report prints.
    pub top_features: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            split_seed: 42,
            forest: ForestConfig::default(),
            top_features: 5,
        }
    }
}

impl TrainConfig {
    /// Reject values the split or the forest cannot work with.
    pub fn validate(&self) -> CardioResult<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(CardioError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.forest.n_estimators == 0 {
            return Err(CardioError::Config("n_estimators must be positive".into()));
        }
        if self.forest.min_samples_split < 2 {
            return Err(CardioError::Config("min_samples_split must be >= 2".into()));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(CardioError::Config("min_samples_leaf must be >= 1".into()));
        }
        Ok(())
    }
}

/// Ordered feature list plus provenance, stored next to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub feature_names: Vec<String>,
    pub trained_at_ms: u64,
    pub crate_version: String,
}

impl FeatureManifest {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            trained_at_ms: time::now_ms(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Scaler, classifier and feature order; written once, read-only afterwards.
#[derive(Clone, Debug)]
pub struct ArtifactBundle {
    pub scaler: StandardScaler,
    pub model: RandomForest,
    pub manifest: FeatureManifest,
}

impl ArtifactBundle {
    /// Assemble a bundle, checking that all three parts agree on the width.
    pub fn new(
        scaler: StandardScaler,
        model: RandomForest,
        manifest: FeatureManifest,
    ) -> CardioResult<Self> {
        let expected = manifest.feature_names.len();
        for got in [scaler.n_features(), model.n_features()] {
            if got != expected {
                return Err(CardioError::DimensionMismatch { expected, got });
            }
        }
        Ok(Self {
            scaler,
            model,
            manifest,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.manifest.feature_names
    }
}

/// Where a saved bundle landed on disk.
#[derive(Clone, Debug)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub features: PathBuf,
}

/// Repository contract for the artefact bundle.
pub trait ArtifactRepo {
    /// Write all three artefacts, replacing any previous ones.
    fn save(&self, bundle: &ArtifactBundle) -> CardioResult<ArtifactPaths>;
    /// Read all three artefacts; any missing or malformed part is an error.
    fn load(&self) -> CardioResult<ArtifactBundle>;
}

/// Result of a training run: the bundle to persist and its held-out scores.
#[derive(Clone, Debug)]
pub struct TrainOutcome {
    pub bundle: ArtifactBundle,
    pub evaluation: EvalSuite,
    pub train_rows: usize,
    pub test_rows: usize,
}
