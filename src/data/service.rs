//! Dataset ingestion and the stratified train/test split.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::common::error::{CardioError, CardioResult};

use super::domain::{Dataset, NUM_CLASSES};

/// Load a labelled CSV file. Every column other than `label_column` is a
/// feature, kept in file order.
pub fn load_csv(path: &Path, label_column: &str) -> CardioResult<Dataset> {
    let file = File::open(path).map_err(|e| CardioError::io(path, e))?;
    let dataset = read_csv(file, label_column)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        features = dataset.n_features(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Parse CSV content from any reader. See [`load_csv`].
pub fn read_csv<R: Read>(reader: R, label_column: &str) -> CardioResult<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == label_column)
        .ok_or_else(|| CardioError::MissingLabel(label_column.to_string()))?;

    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != label_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row_no = idx + 1;

        let raw_label = record.get(label_idx).unwrap_or_default();
        labels.push(parse_label(raw_label).ok_or_else(|| CardioError::InvalidLabel {
            row: row_no,
            value: raw_label.to_string(),
        })?);

        let mut row = Vec::with_capacity(feature_names.len());
        for (col, value) in record.iter().enumerate() {
            if col == label_idx {
                continue;
            }
            let parsed = value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CardioError::InvalidCell {
                    row: row_no,
                    column: headers.get(col).unwrap_or_default().to_string(),
                })?;
            row.push(parsed);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CardioError::EmptyDataset);
    }

    Dataset::new(feature_names, rows, labels)
}

fn parse_label(raw: &str) -> Option<u8> {
    let value: f64 = raw.parse().ok()?;
    if value == 0.0 {
        Some(0)
    } else if value == 1.0 {
        Some(1)
    } else {
        None
    }
}

/// Split into (train, test) keeping the class balance of the input.
///
/// Each class contributes `round(count * test_size)` samples to the test set,
/// clamped so that both sides receive at least one sample.
pub fn stratified_split(
    dataset: &Dataset,
    test_size: f64,
    seed: u64,
) -> CardioResult<(Dataset, Dataset)> {
    if dataset.is_empty() {
        return Err(CardioError::EmptyDataset);
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CardioError::Config(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..NUM_CLASSES as u8 {
        let mut members: Vec<usize> = dataset
            .labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(i, _)| i)
            .collect();

        match members.len() {
            0 => continue,
            1 => {
                return Err(CardioError::ClassTooSmall {
                    class,
                    count: members.len(),
                })
            }
            count => {
                members.shuffle(&mut rng);
                let n_test = ((count as f64 * test_size).round() as usize).clamp(1, count - 1);
                test.extend_from_slice(&members[..n_test]);
                train.extend_from_slice(&members[n_test..]);
            }
        }
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    debug!(train = train.len(), test = test.len(), seed, "stratified split");

    Ok((dataset.subset(&train), dataset.subset(&test)))
}
