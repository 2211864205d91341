//! Service layer orchestrating dataset loading, fitting and persistence.

use std::time::Instant;

use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::CardioResult;
use crate::common::time;
use crate::data::domain::Dataset;
use crate::data::service as data_service;
use crate::evaluation::domain::TARGET_NAMES;
use crate::evaluation::service as eval_service;

use super::domain::{
    ArtifactBundle, ArtifactPaths, ArtifactRepo, FeatureManifest, TrainConfig, TrainOutcome,
};
use super::forest::RandomForest;
use super::scaler::StandardScaler;

/// Split, scale, fit and evaluate. Nothing is written to disk.
pub fn train(dataset: &Dataset, cfg: &TrainConfig) -> CardioResult<TrainOutcome> {
    cfg.validate()?;
    let started = Instant::now();

    let (train_set, test_set) =
        data_service::stratified_split(dataset, cfg.test_size, cfg.split_seed)?;

    let scaler = StandardScaler::fit(&train_set.rows)?;
    let x_train = scaler.transform_all(&train_set.rows)?;
    let x_test = scaler.transform_all(&test_set.rows)?;

    let model = RandomForest::fit(&cfg.forest, &x_train, &train_set.labels)?;
    let predicted = model.predict_all(&x_test)?;

    let evaluation = eval_service::evaluate(
        &test_set.labels,
        &predicted,
        &dataset.feature_names,
        model.feature_importances(),
        cfg.top_features,
    )?;

    info!(
        train = train_set.len(),
        test = test_set.len(),
        trees = cfg.forest.n_estimators,
        accuracy = evaluation.accuracy,
        dur_ms = time::elapsed_ms(started),
        "model trained"
    );

    let manifest = FeatureManifest::new(dataset.feature_names.clone());
    Ok(TrainOutcome {
        bundle: ArtifactBundle::new(scaler, model, manifest)?,
        evaluation,
        train_rows: train_set.len(),
        test_rows: test_set.len(),
    })
}

/// Train and persist the bundle, returning where it was written.
pub fn train_and_save(
    dataset: &Dataset,
    cfg: &TrainConfig,
    repo: &dyn ArtifactRepo,
) -> CardioResult<(TrainOutcome, ArtifactPaths)> {
    let outcome = train(dataset, cfg)?;
    let paths = repo.save(&outcome.bundle)?;
    Ok((outcome, paths))
}

/// Command-line training run: load the CSV named in `cfg`, print the
/// evaluation, and write the artefacts.
pub fn run(cfg: &AppCfg, repo: &dyn ArtifactRepo) -> CardioResult<ArtifactPaths> {
    println!("Loading dataset from {}...", cfg.data_path.display());
    let dataset = data_service::load_csv(&cfg.data_path, &cfg.label_column)?;

    println!(
        "Dataset shape: ({}, {})",
        dataset.len(),
        dataset.n_features() + 1
    );
    println!("\nFeature columns: {:?}", dataset.feature_names);
    println!("\nTarget distribution:");
    for (label, count) in dataset.class_counts().iter().enumerate() {
        println!("{label}    {count}    ({})", TARGET_NAMES[label]);
    }

    if dataset.n_features() != crate::inference::domain::Feature::ALL.len() {
        warn!(
            features = dataset.n_features(),
            "dataset width differs from the 13-field prediction form; the server will refuse these artifacts"
        );
    }

    println!("\nTraining Random Forest model...");
    let (outcome, paths) = train_and_save(&dataset, &cfg.training, repo)?;

    println!("\nTraining samples: {}", outcome.train_rows);
    println!("Testing samples: {}", outcome.test_rows);
    println!("\n{}", outcome.evaluation);

    println!("Model training complete!");
    println!("Model saved to: {}", paths.model.display());
    println!("Scaler saved to: {}", paths.scaler.display());
    println!("Feature names saved to: {}", paths.features.display());
    Ok(paths)
}
