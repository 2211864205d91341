//! Core dataset definitions.

use crate::common::error::{CardioError, CardioResult};

/// Binary class labels used by the classifier.
pub const NUM_CLASSES: usize = 2;

/// Labelled tabular dataset held fully in memory.
///
/// `rows[i]` has one value per entry of `feature_names`, in the same order,
/// and `labels[i]` is its class (0 or 1).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Build a dataset, checking that every row matches the feature list.
    pub fn new(
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        labels: Vec<u8>,
    ) -> CardioResult<Self> {
        if rows.len() != labels.len() {
            return Err(CardioError::DimensionMismatch {
                expected: rows.len(),
                got: labels.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != feature_names.len()) {
            return Err(CardioError::DimensionMismatch {
                expected: feature_names.len(),
                got: bad.len(),
            });
        }
        check_labels(&labels)?;
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of samples per class, indexed by label. Out-of-range labels
    /// are not counted.
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for &label in &self.labels {
            if let Some(count) = counts.get_mut(usize::from(label)) {
                *count += 1;
            }
        }
        counts
    }

    /// Copy the selected rows into a new dataset with the same schema.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Reject any label outside `0..NUM_CLASSES`; rows are reported 1-based.
pub fn check_labels(labels: &[u8]) -> CardioResult<()> {
    match labels
        .iter()
        .position(|&label| usize::from(label) >= NUM_CLASSES)
    {
        Some(idx) => Err(CardioError::InvalidLabel {
            row: idx + 1,
            value: labels[idx].to_string(),
        }),
        None => Ok(()),
    }
}
