//! Evaluation metric structures and the trainer's text report.

use std::fmt;

use crate::data::domain::NUM_CLASSES;

/// Display names for each label, in label order.
pub const TARGET_NAMES: [&str; NUM_CLASSES] = ["No Disease", "Heart Disease"];

/// `matrix[truth][predicted]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..NUM_CLASSES).map(|i| self.matrix[i][i]).sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .matrix
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);
        for (i, row) in self.matrix.iter().enumerate() {
            let open = if i == 0 { "[[" } else { " [" };
            let close = if i + 1 == NUM_CLASSES { "]]" } else { "]" };
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>width$}")).collect();
            writeln!(f, "{open}{}{close}", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Precision, recall, F1 and support for one class or one average.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassificationReport {
    pub per_class: [ClassMetrics; NUM_CLASSES],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_w = TARGET_NAMES
            .iter()
            .map(|n| n.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);
        let line = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{name:>label_w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(
            f,
            "{:>label_w$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in TARGET_NAMES.iter().zip(&self.per_class) {
            line(f, name, m)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>label_w$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.weighted_avg.support
        )?;
        line(f, "macro avg", &self.macro_avg)?;
        line(f, "weighted avg", &self.weighted_avg)
    }
}

/// One feature with its share of the forest's impurity reduction.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Everything the trainer reports about the held-out split.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalSuite {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    /// Sorted by descending importance.
    pub importances: Vec<FeatureImportance>,
    /// How many entries of `importances` the text report shows.
    pub top_features: usize,
}

impl fmt::Display for EvalSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Accuracy: {:.2}%", self.accuracy * 100.0)?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        write!(f, "{}", self.report)?;
        writeln!(f)?;
        writeln!(f, "Confusion Matrix:")?;
        write!(f, "{}", self.confusion)?;
        writeln!(f)?;
        writeln!(f, "Top {} Most Important Features:", self.top_features)?;
        let name_w = self
            .importances
            .iter()
            .map(|fi| fi.feature.len())
            .max()
            .unwrap_or(7)
            .max("feature".len());
        writeln!(f, "{:>name_w$}  importance", "feature")?;
        for fi in self.importances.iter().take(self.top_features) {
            writeln!(f, "{:>name_w$}  {:.6}", fi.feature, fi.importance)?;
        }
        Ok(())
    }
}
