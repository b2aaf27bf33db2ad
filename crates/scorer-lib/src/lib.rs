//! Core library for EV charging station scoring
//!
//! This crate provides the core functionality for:
//! - Feature schema and request validation
//! - Ridge model training and evaluation
//! - Versioned model artifacts
//! - Online scoring with optional shared-secret authorization
//! - Run-log telemetry and observability

pub mod artifact;
pub mod error;
pub mod observability;
pub mod schema;
pub mod scoring;
pub mod telemetry;
pub mod training;

pub use artifact::{FeatureWeights, LoadedArtifact, ModelArtifact};
pub use error::{
    ArtifactError, DataError, FitError, InsufficientDataError, ScoringError, StartupError,
    TelemetryError, TrainingError, ValidationError,
};
pub use observability::{ScorerMetrics, StructuredLogger};
pub use schema::{Feature, FeatureRecord, FeatureSchema, Sample, UsageScoreDomain, NUM_FEATURES};
pub use scoring::{ScoreResponse, ScoringConfig, ScoringService};
pub use telemetry::{HttpSink, JsonlFileSink, NoopSink, RunLogSink, RunSummary};
pub use training::{EvaluationMetrics, NormalizationCaps, TrainingConfig, TrainingReport};
