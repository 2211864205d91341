//! Runtime configuration: defaults, then an optional TOML file, then the
//! process environment. CLI flags are applied last by the binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::error::{CardioError, CardioResult};
use crate::training::domain::TrainConfig;

/// Environment variable naming the TOML file to layer over the defaults.
pub const CONFIG_ENV: &str = "CARDIO_CONFIG";

/// Snapshot of configuration values consumed by the trainer and the server.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub model_dir: PathBuf,
    pub data_path: PathBuf,
    pub label_column: String,
    pub bind_addr: String,
    pub log_filter: String,
    pub training: TrainConfig,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("model"),
            data_path: PathBuf::from("heart.csv"),
            label_column: "target".to_string(),
            bind_addr: "0.0.0.0:5000".to_string(),
            log_filter: "info".to_string(),
            training: TrainConfig::default(),
        }
    }
}

impl AppCfg {
    /// Build a configuration snapshot from `CARDIO_CONFIG` (if set) and the
    /// process environment.
    pub fn load() -> CardioResult<Self> {
        let file = env::var(CONFIG_ENV).ok().filter(|v| !v.is_empty());
        Self::load_from(file.as_deref().map(Path::new))
    }

    /// Same as [`AppCfg::load`] but with an explicit config file.
    pub fn load_from(file: Option<&Path>) -> CardioResult<Self> {
        let mut cfg = Self::default();
        if let Some(path) = file {
            cfg.apply_file(path)?;
        }
        cfg.apply_env(|key| env::var(key).ok());
        cfg.training.validate()?;
        Ok(cfg)
    }

    /// Layer a TOML file over the current values.
    pub fn apply_file(&mut self, path: &Path) -> CardioResult<()> {
        let raw = fs::read_to_string(path).map_err(|e| CardioError::io(path, e))?;
        self.apply_toml(&raw).map_err(|source| CardioError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_toml(&mut self, raw: &str) -> Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(raw)?;

        if let Some(paths) = file.paths {
            if let Some(v) = non_empty(paths.model_dir) {
                self.model_dir = PathBuf::from(v);
            }
            if let Some(v) = non_empty(paths.data_path) {
                self.data_path = PathBuf::from(v);
            }
            if let Some(v) = non_empty(paths.label_column) {
                self.label_column = v;
            }
        }
        if let Some(v) = file.server.and_then(|s| non_empty(s.bind_addr)) {
            self.bind_addr = v;
        }
        if let Some(v) = file.logging.and_then(|l| non_empty(l.filter)) {
            self.log_filter = v;
        }
        if let Some(training) = file.training {
            training.apply(&mut self.training);
        }
        Ok(())
    }

    /// Layer environment overrides; `lookup` is `env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(v) = get("CARDIO_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CARDIO_DATA_PATH") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = get("CARDIO_LABEL_COLUMN") {
            self.label_column = v;
        }
        if let Some(v) = get("CARDIO_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("CARDIO_LOG") {
            self.log_filter = v;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    paths: Option<FilePaths>,
    server: Option<FileServer>,
    logging: Option<FileLogging>,
    training: Option<FileTraining>,
}

#[derive(Debug, Default, Deserialize)]
struct FilePaths {
    model_dir: Option<String>,
    data_path: Option<String>,
    label_column: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServer {
    bind_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileTraining {
    test_size: Option<f64>,
    split_seed: Option<u64>,
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
    min_samples_leaf: Option<usize>,
    forest_seed: Option<u64>,
    top_features: Option<usize>,
}

impl FileTraining {
    fn apply(self, cfg: &mut TrainConfig) {
        if let Some(v) = self.test_size {
            cfg.test_size = v;
        }
        if let Some(v) = self.split_seed {
            cfg.split_seed = v;
        }
        if let Some(v) = self.n_estimators {
            cfg.forest.n_estimators = v;
        }
        if let Some(v) = self.max_depth {
            // 0 lifts the depth limit.
            cfg.forest.max_depth = (v > 0).then_some(v);
        }
        if let Some(v) = self.min_samples_split {
            cfg.forest.min_samples_split = v;
        }
        if let Some(v) = self.min_samples_leaf {
            cfg.forest.min_samples_leaf = v;
        }
        if let Some(v) = self.forest_seed {
            cfg.forest.seed = v;
        }
        if let Some(v) = self.top_features {
            cfg.top_features = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_training_script() {
        let cfg = AppCfg::default();
        assert_eq!(cfg.model_dir, PathBuf::from("model"));
        assert_eq!(cfg.label_column, "target");
        assert_eq!(cfg.training.test_size, 0.2);
        assert_eq!(cfg.training.forest.n_estimators, 100);
        assert_eq!(cfg.training.forest.max_depth, Some(10));
    }

    #[test]
    fn toml_overrides_defaults() {
        let mut cfg = AppCfg::default();
        cfg.apply_toml(
            r#"
            [paths]
            model_dir = "artifacts"
            label_column = ""

            [server]
            bind_addr = "127.0.0.1:8080"

            [training]
            n_estimators = 25
            max_depth = 0
            "#,
        )
        .expect("valid toml");

        assert_eq!(cfg.model_dir, PathBuf::from("artifacts"));
        assert_eq!(cfg.label_column, "target");
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.training.forest.n_estimators, 25);
        assert_eq!(cfg.training.forest.max_depth, None);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = AppCfg::default();
        cfg.apply_toml("[paths]\nmodel_dir = \"from-file\"\n")
            .expect("valid toml");

        let vars: HashMap<&str, &str> =
            [("CARDIO_MODEL_DIR", "from-env"), ("CARDIO_LOG", "  ")].into();
        cfg.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.model_dir, PathBuf::from("from-env"));
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = AppCfg::load_from(Some(dir.path().join("missing.toml").as_path()))
            .expect_err("missing file");
        assert!(matches!(err, CardioError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_a_toml_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cardio.toml");
        fs::write(&path, "[training\nn_estimators = ").expect("write");
        let err = AppCfg::load_from(Some(path.as_path())).expect_err("bad toml");
        assert!(matches!(err, CardioError::Toml { .. }));
    }

    #[test]
    fn out_of_range_training_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cardio.toml");
        fs::write(&path, "[training]\ntest_size = 1.5\n").expect("write");
        let err = AppCfg::load_from(Some(path.as_path())).expect_err("bad test_size");
        assert!(matches!(err, CardioError::Config(_)));
    }
}
