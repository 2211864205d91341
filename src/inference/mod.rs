//! Inference domain: form schema, validation and scoring.

pub mod domain;
pub mod service;

pub use domain::{Feature, PatientForm, PatientRecord, Prediction, ValidationError};
pub use service::{ScoreError, Scorer, ServiceContext};
