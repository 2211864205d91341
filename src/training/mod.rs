//! Training domain: scaler, forest, artefact bundle and the trainer run.

pub mod domain;
pub mod forest;
pub mod repo_fs;
pub mod scaler;
pub mod service;
pub mod synthetic;

pub use domain::{ArtifactBundle, ArtifactRepo, ForestConfig, TrainConfig, TrainOutcome};
pub use forest::RandomForest;
pub use repo_fs::FsArtifactRepo;
pub use scaler::StandardScaler;
