//! Batch training run
//!
//! load -> split -> caps (train fold) -> normalize -> fit -> evaluate ->
//! persist artifact and sidecar -> run-log sink.

use super::dataset::{self, LoadedDataset};
use super::evaluate::{evaluate, EvaluationMetrics, DEFAULT_THRESHOLD};
use super::normalizer::{self, NormalizationCaps};
use super::ridge::{self, LinearFit, DEFAULT_LAMBDA};
use super::split::{split_samples, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::artifact::{self, ModelArtifact};
use crate::error::{DataError, TrainingError};
use crate::schema::{FeatureSchema, Sample};
use crate::telemetry::{RunLogSink, RunSummary};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default version tag written into artifacts
pub const DEFAULT_MODEL_VERSION: &str = "v2-manual";

/// Training run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// CSV training input
    pub input: PathBuf,
    /// Destination of the model artifact
    pub artifact_path: PathBuf,
    /// Opaque version tag stored in the artifact
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub schema: FeatureSchema,
}

fn default_model_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

fn default_test_fraction() -> f64 {
    DEFAULT_TEST_FRACTION
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_lambda() -> f64 {
    DEFAULT_LAMBDA
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl TrainingConfig {
    pub fn new(input: impl Into<PathBuf>, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            artifact_path: artifact_path.into(),
            model_version: default_model_version(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            lambda: default_lambda(),
            threshold: default_threshold(),
            schema: FeatureSchema::default(),
        }
    }
}

/// Outcome of a training run, also written as the metrics sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub version: String,
    pub artifact_path: PathBuf,
    pub checksum: String,
    pub n_train: usize,
    pub n_test: usize,
    /// False when evaluation fell back to the training set
    pub held_out: bool,
    pub malformed_rows: usize,
    pub rejected_rows: usize,
    pub caps: NormalizationCaps,
    pub metrics: EvaluationMetrics,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

/// Everything produced in memory by one fit, before persistence
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub artifact: ModelArtifact,
    pub fit: LinearFit,
    pub metrics: EvaluationMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub held_out: bool,
}

/// Fit and evaluate on in-memory samples without touching storage
pub fn fit_and_evaluate(
    samples: &[Sample],
    config: &TrainingConfig,
) -> Result<FittedModel, TrainingError> {
    if samples.is_empty() {
        return Err(DataError::Empty.into());
    }

    let (train, test, held_out) = match split_samples(samples, config.test_fraction, config.seed) {
        Ok((train, test)) => (train, test, true),
        Err(e) => {
            warn!(error = %e, "Evaluating on the full training set");
            (samples.to_vec(), samples.to_vec(), false)
        }
    };

    let caps = normalizer::compute_caps(&train)?;
    debug!(
        power_kw_max = caps.power_kw_max,
        n_connectors_max = caps.n_connectors_max,
        rating_max = caps.rating_max,
        "Normalization caps computed from training fold"
    );
    let train_norm = normalizer::apply(&train, &caps);
    let test_norm = normalizer::apply(&test, &caps);

    let fit = ridge::fit_samples(&train_norm, config.lambda)?;

    let y_true: Vec<f64> = test_norm.iter().map(|s| s.label).collect();
    let y_pred: Vec<f64> = test_norm.iter().map(|s| fit.predict(&s.features)).collect();
    let metrics = evaluate(&y_true, &y_pred, config.threshold);

    Ok(FittedModel {
        artifact: ModelArtifact::new(config.model_version.clone(), &fit, caps),
        fit,
        metrics,
        n_train: train.len(),
        n_test: test.len(),
        held_out,
    })
}

/// Run the whole pipeline, persisting the artifact and notifying the sink
pub async fn run(
    config: &TrainingConfig,
    sink: &dyn RunLogSink,
) -> Result<TrainingReport, TrainingError> {
    let report = run_offline(config)?;

    let summary = RunSummary {
        model_version: report.version.clone(),
        samples_used: report.n_train,
        metrics: report.metrics.clone(),
        recorded_at: report.trained_at,
    };
    if let Err(e) = sink.record(&summary).await {
        warn!(sink = sink.name(), error = %e, "Failed to record training run, continuing");
    }

    Ok(report)
}

/// Run the pipeline without a run-log sink
pub fn run_offline(config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    let start = Instant::now();
    info!(
        input = %config.input.display(),
        version = %config.model_version,
        "Starting training run"
    );

    let LoadedDataset {
        samples,
        malformed,
        rejected,
    } = dataset::load_csv(&config.input, &config.schema)?;

    let fitted = fit_and_evaluate(&samples, config)?;
    let checksum = artifact::save(&fitted.artifact, &config.artifact_path)?;

    let report = TrainingReport {
        version: fitted.artifact.version.clone(),
        artifact_path: config.artifact_path.clone(),
        checksum,
        n_train: fitted.n_train,
        n_test: fitted.n_test,
        held_out: fitted.held_out,
        malformed_rows: malformed,
        rejected_rows: rejected,
        caps: fitted.artifact.caps,
        metrics: fitted.metrics,
        trained_at: chrono::Utc::now(),
    };

    if let Err(e) = artifact::save_sidecar(&config.artifact_path, &report) {
        warn!(error = %e, "Failed to write metrics sidecar");
    }

    info!(
        event = "training_completed",
        version = %report.version,
        n_train = report.n_train,
        n_test = report.n_test,
        held_out = report.held_out,
        accuracy = ?report.metrics.accuracy,
        precision = ?report.metrics.precision,
        recall = ?report.metrics.recall,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Training run completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DataError, TelemetryError};
    use crate::schema::NUM_FEATURES;
    use crate::telemetry::NoopSink;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FailingSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RunLogSink for FailingSink {
        async fn record(&self, _summary: &RunSummary) -> Result<(), TelemetryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TelemetryError::Status(500))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn config_in(dir: &TempDir) -> TrainingConfig {
        TrainingConfig::new(
            dir.path().join("training_data.csv"),
            dir.path().join("model.json"),
        )
    }

    #[test]
    fn test_constant_labels_scenario() {
        let samples = vec![
            Sample {
                features: [0.0; NUM_FEATURES],
                label: 0.5,
            };
            10
        ];
        let dir = TempDir::new().unwrap();
        let fitted = fit_and_evaluate(&samples, &config_in(&dir)).unwrap();

        for w in fitted.fit.weights {
            assert_relative_eq!(w, 0.0, epsilon = 1e-9);
        }
        assert_relative_eq!(fitted.fit.bias, 0.5, epsilon = 1e-3);
        assert_eq!(fitted.metrics.accuracy, Some(1.0));
        assert_eq!(fitted.n_test, 2);
        assert!(fitted.held_out);
    }

    #[test]
    fn test_constant_nonzero_features_share_weight_with_bias() {
        let samples = vec![
            Sample {
                features: [50.0, 4.0, 1.0, 4.5, 1.0, 1.0],
                label: 0.5,
            };
            10
        ];
        let dir = TempDir::new().unwrap();
        let fitted = fit_and_evaluate(&samples, &config_in(&dir)).unwrap();

        assert_eq!(fitted.metrics.accuracy, Some(1.0));
        assert!(fitted.fit.bias > 0.05 && fitted.fit.bias < 0.1);

        let normalized = normalizer::apply(&samples, &fitted.artifact.caps);
        for sample in &normalized {
            let prediction = fitted.fit.predict(&sample.features);
            assert_relative_eq!(prediction, 0.5, epsilon = 1e-3);
            assert!(prediction <= 0.5);
        }
    }

    #[test]
    fn test_single_sample_falls_back_to_full_set() {
        let samples = vec![Sample {
            features: [50.0, 4.0, 1.0, 4.5, 1.0, 1.0],
            label: 0.9,
        }];
        let dir = TempDir::new().unwrap();
        let fitted = fit_and_evaluate(&samples, &config_in(&dir)).unwrap();
        assert!(!fitted.held_out);
        assert_eq!(fitted.n_train, 1);
        assert_eq!(fitted.n_test, 1);
        assert_eq!(fitted.metrics.n, 1);
    }

    #[test]
    fn test_caps_come_from_training_fold() {
        let samples = dataset::synthesize(40, 11);
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let fitted = fit_and_evaluate(&samples, &config).unwrap();

        let (train, _) = split_samples(&samples, config.test_fraction, config.seed).unwrap();
        let expected = normalizer::compute_caps(&train).unwrap();
        assert_eq!(fitted.artifact.caps, expected);
    }

    #[test]
    fn test_synthetic_data_scores_well() {
        let samples = dataset::synthesize(250, 42);
        let dir = TempDir::new().unwrap();
        let fitted = fit_and_evaluate(&samples, &config_in(&dir)).unwrap();
        assert!(fitted.metrics.accuracy.unwrap() > 0.75);
        assert!(fitted.fit.weights[2] > 0.0, "fast DC should raise the score");
    }

    #[tokio::test]
    async fn test_run_writes_artifact_and_sidecar() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        dataset::write_csv(&dataset::synthesize(60, 5), &config.input).unwrap();

        let report = run(&config, &NoopSink).await.unwrap();
        assert_eq!(report.n_train + report.n_test, 60);

        let loaded = artifact::load(&config.artifact_path).unwrap();
        assert_eq!(loaded.artifact.version, DEFAULT_MODEL_VERSION);
        assert_eq!(loaded.checksum, report.checksum);

        let sidecar: TrainingReport = artifact::load_sidecar(&config.artifact_path).unwrap();
        assert_eq!(sidecar, report);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_run() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        dataset::write_csv(&dataset::synthesize(20, 5), &config.input).unwrap();

        let sink = FailingSink {
            calls: AtomicUsize::new(0),
        };
        let report = run(&config, &sink).await;
        assert!(report.is_ok());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
        assert!(config.artifact_path.exists());
    }

    #[tokio::test]
    async fn test_missing_input_aborts_before_fit() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let err = run(&config, &NoopSink).await.unwrap_err();
        assert!(matches!(err, TrainingError::Data(DataError::Missing(_))));
        assert!(!config.artifact_path.exists());
    }
}
