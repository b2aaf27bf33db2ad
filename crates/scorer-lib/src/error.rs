//! Error taxonomy for training and serving
//!
//! Training errors (`DataError`, `FitError`, `ArtifactError`) abort a run.
//! `InsufficientDataError` is recoverable by evaluating on the full set.
//! `ValidationError` is scoped to a single scoring request and
//! `TelemetryError` is always logged and swallowed by the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with training input
#[derive(Debug, Error)]
pub enum DataError {
    #[error("training input not found: {0}")]
    Missing(PathBuf),

    #[error("failed to read training input {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write training data {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("training input is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("no usable rows in training input ({malformed} malformed, {rejected} rejected)")]
    NoUsableRows { malformed: usize, rejected: usize },

    #[error("at least one sample is required")]
    Empty,
}

/// Fewer than two samples, so no held-out split exists
#[derive(Debug, Error)]
#[error("cannot split {available} sample(s) into train and test folds")]
pub struct InsufficientDataError {
    pub available: usize,
}

/// Ridge solve failures
#[derive(Debug, Error)]
pub enum FitError {
    #[error("regularized normal equations are not positive definite (rank deficient at column {column} of {dim})")]
    Singular { column: usize, dim: usize },

    #[error("cannot fit on zero samples")]
    NoSamples,

    #[error("solution contains non-finite coefficients")]
    NonFinite,

    #[error("feature matrix has {rows} rows but target has {targets} values")]
    DimensionMismatch { rows: usize, targets: usize },
}

/// A scoring request field outside the schema
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value {value} for `{field}`: expected {expected}")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: f64,
    pub expected: &'static str,
}

/// Artifact persistence failures
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("no model artifact at {0}")]
    Missing(PathBuf),

    #[error("malformed model artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model artifact field `{0}` is not finite")]
    NonFinite(String),

    #[error("artifact I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize model artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Best-effort run-log failures
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("run-log request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("run-log endpoint returned {0}")]
    Status(u16),

    #[error("run-log write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("run-log encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Anything that aborts a training run
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Scoring service startup failures
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no model artifact at {0} and training on startup is disabled")]
    ArtifactMissing(PathBuf),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("training on startup failed: {0}")]
    Training(#[from] TrainingError),
}

/// Per-request scoring failures
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid key")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
