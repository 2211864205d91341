//! Metric calculators for the held-out split.

use crate::common::error::{CardioError, CardioResult};
use crate::data::domain::{check_labels, NUM_CLASSES};

use super::domain::{
    ClassMetrics, ClassificationReport, ConfusionMatrix, EvalSuite, FeatureImportance,
};

pub fn confusion_matrix(truth: &[u8], predicted: &[u8]) -> CardioResult<ConfusionMatrix> {
    if truth.len() != predicted.len() {
        return Err(CardioError::DimensionMismatch {
            expected: truth.len(),
            got: predicted.len(),
        });
    }
    check_labels(truth)?;
    check_labels(predicted)?;

    let mut cm = ConfusionMatrix::default();
    for (&t, &p) in truth.iter().zip(predicted) {
        cm.matrix[usize::from(t)][usize::from(p)] += 1;
    }
    Ok(cm)
}

/// Share of correct predictions; 0 for an empty matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.correct(), cm.total())
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn classification_report(cm: &ConfusionMatrix) -> ClassificationReport {
    let per_class: [ClassMetrics; NUM_CLASSES] = std::array::from_fn(|c| {
        let tp = cm.matrix[c][c];
        let predicted: usize = (0..NUM_CLASSES).map(|t| cm.matrix[t][c]).sum();
        let support: usize = cm.matrix[c].iter().sum();
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support,
        }
    });

    let total = cm.total();
    let n = NUM_CLASSES as f64;
    let macro_avg = ClassMetrics {
        precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n,
        recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n,
        f1: per_class.iter().map(|m| m.f1).sum::<f64>() / n,
        support: total,
    };
    let weighted = |pick: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            0.0
        } else {
            per_class
                .iter()
                .map(|m| pick(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        }
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: total,
    };

    ClassificationReport {
        per_class,
        accuracy: accuracy(cm),
        macro_avg,
        weighted_avg,
    }
}

/// Pair names with importances and sort, most important first.
pub fn ranked_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Compute the full evaluation for one set of predictions.
pub fn evaluate(
    truth: &[u8],
    predicted: &[u8],
    feature_names: &[String],
    importances: &[f64],
    top_features: usize,
) -> CardioResult<EvalSuite> {
    let confusion = confusion_matrix(truth, predicted)?;
    let report = classification_report(&confusion);
    Ok(EvalSuite {
        accuracy: report.accuracy,
        report,
        confusion,
        importances: ranked_importances(feature_names, importances),
        top_features,
    })
}
