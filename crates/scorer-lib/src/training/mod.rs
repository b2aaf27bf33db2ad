//! Scoring model training
//!
//! This module provides:
//! - Training data loading and synthetic data generation
//! - Cap computation and normalization
//! - Seeded train/test partitioning
//! - Closed-form ridge regression
//! - Threshold-based evaluation
//! - The end-to-end training pipeline

pub mod dataset;
mod evaluate;
pub mod normalizer;
pub mod pipeline;
mod ridge;
mod split;

pub use dataset::{load_csv, synthesize, write_csv, LoadedDataset};
pub use evaluate::{confusion, evaluate, ConfusionCounts, EvaluationMetrics, DEFAULT_THRESHOLD};
pub use normalizer::{apply, compute_caps, normalize, NormalizationCaps, CAP_PERCENTILE};
pub use pipeline::{
    fit_and_evaluate, run, run_offline, FittedModel, TrainingConfig, TrainingReport,
    DEFAULT_MODEL_VERSION,
};
pub use ridge::{design_matrix, fit, fit_samples, LinearFit, DEFAULT_LAMBDA};
pub use split::{split, split_samples, SplitIndices, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
