//! Deterministic synthetic patient cohorts.
//!
//! Columns follow the prediction form's field order and the label depends on
//! a noisy linear risk score, so a forest can learn it but not perfectly.
//! Used by the `synth` subcommand for demo data and by the test suites.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::error::{CardioError, CardioResult};
use crate::data::domain::Dataset;
use crate::inference::domain::Feature;

/// Generate `n` labelled patients from `seed`.
pub fn patients(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);

    for _ in 0..n {
        let age = rng.gen_range(29..=77) as f64;
        let sex = f64::from(u8::from(rng.gen_bool(0.68)));
        let cp = rng.gen_range(0..=3) as f64;
        let trestbps = rng.gen_range(94..=200) as f64;
        let chol = rng.gen_range(126..=564) as f64;
        let fbs = f64::from(u8::from(rng.gen_bool(0.15)));
        let restecg = rng.gen_range(0..=2) as f64;
        let thalach = rng.gen_range(71..=202) as f64;
        let exang = f64::from(u8::from(rng.gen_bool(0.33)));
        let u: f64 = rng.gen();
        let oldpeak = (u * u * 62.0).round() / 10.0;
        let slope = rng.gen_range(0..=2) as f64;
        let ca = rng.gen_range(0..=4) as f64;
        let thal = rng.gen_range(0..=3) as f64;

        let score = 0.9 * (cp - 1.5) + 0.03 * (thalach - 136.5)
            - 0.8 * (oldpeak - 2.07)
            - 0.7 * (ca - 2.0)
            - 1.0 * (exang - 0.33)
            - 0.6 * (sex - 0.68)
            + rng.gen_range(-1.0..1.0);

        rows.push(vec![
            age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak, slope, ca, thal,
        ]);
        labels.push(u8::from(score > 0.0));
    }

    Dataset {
        feature_names: Feature::ALL.iter().map(|f| f.name().to_string()).collect(),
        rows,
        labels,
    }
}

/// Write a dataset as CSV with a trailing `target` column.
pub fn write_csv(dataset: &Dataset, path: &Path) -> CardioResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = dataset.feature_names.clone();
    header.push("target".to_string());
    writer.write_record(&header)?;

    for (row, label) in dataset.rows.iter().zip(&dataset.labels) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(label.to_string());
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| CardioError::io(path, e))
}
