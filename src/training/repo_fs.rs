//! Filesystem repository for the trained artefact bundle.
//!
//! Three JSON documents live side by side in the model directory and are
//! always written and read together.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::{CardioError, CardioResult};

use super::domain::{ArtifactBundle, ArtifactPaths, ArtifactRepo, FeatureManifest};

pub const MODEL_FILE: &str = "heart_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURES_FILE: &str = "feature_names.json";

/// Persist the bundle under a single directory.
pub struct FsArtifactRepo {
    root: PathBuf,
}

impl FsArtifactRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_cfg(cfg: &AppCfg) -> Self {
        Self::new(&cfg.model_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.root.join(MODEL_FILE),
            scaler: self.root.join(SCALER_FILE),
            features: self.root.join(FEATURES_FILE),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CardioResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| CardioError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|e| CardioError::json(path, e))?;
    writer.flush().map_err(|e| CardioError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CardioResult<T> {
    let file = File::open(path).map_err(|e| CardioError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CardioError::json(path, e))
}

impl ArtifactRepo for FsArtifactRepo {
    fn save(&self, bundle: &ArtifactBundle) -> CardioResult<ArtifactPaths> {
        fs::create_dir_all(&self.root).map_err(|e| CardioError::io(&self.root, e))?;
        let paths = self.paths();

        write_json(&paths.model, &bundle.model)?;
        write_json(&paths.scaler, &bundle.scaler)?;
        write_json(&paths.features, &bundle.manifest)?;

        info!(dir = %self.root.display(), "artifacts written");
        Ok(paths)
    }

    fn load(&self) -> CardioResult<ArtifactBundle> {
        let paths = self.paths();
        let model = read_json(&paths.model)?;
        let scaler = read_json(&paths.scaler)?;
        let manifest: FeatureManifest = read_json(&paths.features)?;
        ArtifactBundle::new(scaler, model, manifest)
    }
}
