//! Error handling primitives shared across the core.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes attached to log events.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Input failed validation (dataset contents, configuration values).
    InvalidInput = 1,
    /// Requested model artefact was not available or did not match.
    ModelMissing = 2,
    /// Filesystem failure.
    Io = 3,
    /// Catch-all for bugs and inconsistent state.
    Internal = 4,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum CardioError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataset must contain a '{0}' column")]
    MissingLabel(String),

    #[error("row {row}: label '{value}' is not 0 or 1")]
    InvalidLabel { row: usize, value: String },

    #[error("row {row}: column '{column}' is not a finite number")]
    InvalidCell { row: usize, column: String },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("class {class} has {count} sample(s); at least 2 are needed to stratify")]
    ClassTooSmall { class: u8, count: usize },

    #[error("expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("artifact feature list does not match the input schema: {0}")]
    FeatureSchema(String),

    #[error("model has not been fitted")]
    NotFitted,

    #[error("{0} contain non-finite values")]
    NonFinite(&'static str),
}

/// Result alias used throughout the crate.
pub type CardioResult<T> = Result<T, CardioError>;

impl CardioError {
    /// IO helper that records the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// JSON helper that records the offending path.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Machine readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CardioError::Io { .. } => ErrorCode::Io,
            CardioError::Json { .. } | CardioError::FeatureSchema(_) => ErrorCode::ModelMissing,
            CardioError::Csv(_)
            | CardioError::Toml { .. }
            | CardioError::Config(_)
            | CardioError::MissingLabel(_)
            | CardioError::InvalidLabel { .. }
            | CardioError::InvalidCell { .. }
            | CardioError::EmptyDataset
            | CardioError::ClassTooSmall { .. } => ErrorCode::InvalidInput,
            CardioError::DimensionMismatch { .. }
            | CardioError::NotFitted
            | CardioError::NonFinite(_) => ErrorCode::Internal,
        }
    }
}
