//! Held-out evaluation: confusion matrix, per-class report, importances.

pub mod domain;
pub mod service;

pub use domain::{ClassificationReport, ConfusionMatrix, EvalSuite};
