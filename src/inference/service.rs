//! Scoring against the loaded artefact bundle.
//!
//! [`ServiceContext`] is built once at startup and shared read-only by every
//! request. It is either ready to score or degraded for the rest of the
//! process lifetime.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::common::error::{CardioError, CardioResult};
use crate::training::domain::{ArtifactBundle, ArtifactRepo};

use super::domain::{
    advisory_message, Feature, PatientRecord, Prediction, Probability, RiskTier,
};

/// Why scoring did not produce a prediction.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Model not loaded. Please train the model first.")]
    ModelUnavailable,
    #[error("prediction failed: {0}")]
    Internal(#[from] CardioError),
}

/// Bundle plus the permutation from canonical form order to trained order.
#[derive(Debug)]
pub struct Scorer {
    bundle: ArtifactBundle,
    order: Vec<Feature>,
}

impl Scorer {
    /// Accept a bundle only if its feature list is exactly the form's fields
    /// (in any order).
    pub fn new(bundle: ArtifactBundle) -> CardioResult<Self> {
        let names = bundle.feature_names();
        if names.len() != Feature::ALL.len() {
            return Err(CardioError::FeatureSchema(format!(
                "expected {} features, artifacts list {}",
                Feature::ALL.len(),
                names.len()
            )));
        }

        let mut order = Vec::with_capacity(names.len());
        for name in names {
            let feature = Feature::from_name(name).ok_or_else(|| {
                CardioError::FeatureSchema(format!("unknown feature '{name}'"))
            })?;
            if order.contains(&feature) {
                return Err(CardioError::FeatureSchema(format!(
                    "duplicate feature '{name}'"
                )));
            }
            order.push(feature);
        }

        Ok(Self { bundle, order })
    }

    /// Measurements laid out in the order the model was trained on.
    pub fn feature_vector(&self, record: &PatientRecord) -> Vec<f64> {
        self.order.iter().map(|f| record.get(*f)).collect()
    }

    pub fn score(&self, record: &PatientRecord) -> CardioResult<Prediction> {
        let scaled = self.bundle.scaler.transform(&self.feature_vector(record))?;
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(CardioError::NonFinite("scaled features"));
        }
        let proba = self.bundle.model.predict_proba(&scaled)?;
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(CardioError::NonFinite("class probabilities"));
        }
        let label = self.bundle.model.predict(&scaled)?;

        Ok(Prediction {
            prediction: label,
            probability: Probability {
                no_disease: proba[0] * 100.0,
                disease: proba[1] * 100.0,
            },
            risk_level: RiskTier::from_label(label),
            message: advisory_message(label, record),
        })
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }
}

/// Startup outcome; never changes afterwards.
#[derive(Debug)]
pub enum ServiceContext {
    Ready(Scorer),
    Degraded { reason: String },
}

impl ServiceContext {
    /// Load artefacts from `repo`. Failures are logged and produce a
    /// degraded context instead of an error.
    pub fn load(repo: &dyn ArtifactRepo) -> Self {
        match repo.load().and_then(Scorer::new) {
            Ok(scorer) => {
                info!(
                    features = scorer.bundle().feature_names().len(),
                    trees = scorer.bundle().model.trees().len(),
                    trained_at_ms = scorer.bundle().manifest.trained_at_ms,
                    "model loaded"
                );
                ServiceContext::Ready(scorer)
            }
            Err(err) => {
                error!(
                    code = err.code() as u32,
                    error = %err,
                    "error loading model; prediction endpoint disabled"
                );
                ServiceContext::Degraded {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn from_bundle(bundle: ArtifactBundle) -> CardioResult<Self> {
        Scorer::new(bundle).map(ServiceContext::Ready)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceContext::Ready(_))
    }

    pub fn score(&self, record: &PatientRecord) -> Result<Prediction, ScoreError> {
        match self {
            ServiceContext::Ready(scorer) => scorer.score(record).map_err(|err| {
                warn!(code = err.code() as u32, error = %err, "scoring failed");
                ScoreError::Internal(err)
            }),
            ServiceContext::Degraded { .. } => Err(ScoreError::ModelUnavailable),
        }
    }
}
