//! Online scoring against a loaded model artifact
//!
//! The service holds a read-only copy of the artifact for the process
//! lifetime; concurrent requests only read it. Picking up a new artifact
//! requires a restart.

use crate::artifact::{self, LoadedArtifact};
use crate::error::{ArtifactError, ScoringError, StartupError, ValidationError};
use crate::schema::{Feature, FeatureRecord, FeatureSchema, NUM_FEATURES};
use crate::training::{self, normalizer, TrainingConfig, TrainingReport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Settings the service needs at startup
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub artifact_path: PathBuf,
    /// Shared secret; `None` disables request authorization
    pub api_key: Option<String>,
    pub schema: FeatureSchema,
    /// Training run used when no artifact exists; `None` fails fast instead
    pub train_on_missing: Option<TrainingConfig>,
}

impl ScoringConfig {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            api_key: None,
            schema: FeatureSchema::default(),
            train_on_missing: None,
        }
    }
}

/// Score plus what produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: f64,
    pub model_version: String,
    pub features_used: Vec<String>,
}

/// Validates, normalizes and scores station records
#[derive(Debug, Clone)]
pub struct ScoringService {
    loaded: LoadedArtifact,
    weights: [f64; NUM_FEATURES],
    schema: FeatureSchema,
    api_key: Option<String>,
    training: Option<TrainingReport>,
}

impl ScoringService {
    /// Load the current artifact, training first when configured to
    pub fn start(config: &ScoringConfig) -> Result<Self, StartupError> {
        let loaded = match artifact::load(&config.artifact_path) {
            Ok(loaded) => loaded,
            Err(ArtifactError::Missing(path)) => {
                let Some(training) = &config.train_on_missing else {
                    return Err(StartupError::ArtifactMissing(path));
                };
                warn!(
                    artifact = %path.display(),
                    input = %training.input.display(),
                    "No model artifact found, running training before serving"
                );
                let mut training = training.clone();
                training.artifact_path = config.artifact_path.clone();
                training::run_offline(&training)?;
                artifact::load(&config.artifact_path)?
            }
            Err(e) => return Err(e.into()),
        };

        let training = artifact::load_sidecar(&config.artifact_path);
        info!(
            version = %loaded.artifact.version,
            checksum = %loaded.checksum,
            has_training_report = training.is_some(),
            "Scoring service ready"
        );

        let mut service = Self::from_artifact(loaded, config.schema, config.api_key.clone());
        service.training = training;
        Ok(service)
    }

    /// Build a service around an already-loaded artifact
    pub fn from_artifact(
        loaded: LoadedArtifact,
        schema: FeatureSchema,
        api_key: Option<String>,
    ) -> Self {
        let weights = loaded.artifact.weights.to_array();
        Self {
            loaded,
            weights,
            schema,
            api_key: api_key.filter(|k| !k.is_empty()),
            training: None,
        }
    }

    /// Check a presented key against the configured secret
    pub fn authorize(&self, token: Option<&str>) -> Result<(), ScoringError> {
        match &self.api_key {
            None => Ok(()),
            Some(expected) if token == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(ScoringError::Unauthorized),
        }
    }

    /// Score one record, rejecting anything outside the schema
    pub fn score(&self, record: &FeatureRecord) -> Result<ScoreResponse, ValidationError> {
        self.schema.validate(record)?;
        Ok(ScoreResponse {
            score: self.raw_score(record),
            model_version: self.loaded.artifact.version.clone(),
            features_used: Feature::names(),
        })
    }

    fn raw_score(&self, record: &FeatureRecord) -> f64 {
        let normalized = normalizer::normalize(&record.to_array(), &self.loaded.artifact.caps);
        let linear: f64 = self
            .weights
            .iter()
            .zip(normalized.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.loaded.artifact.bias;
        normalizer::clamp01(linear)
    }

    pub fn auth_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model_version(&self) -> &str {
        &self.loaded.artifact.version
    }

    pub fn artifact(&self) -> &LoadedArtifact {
        &self.loaded
    }

    pub fn training_report(&self) -> Option<&TrainingReport> {
        self.training.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{FeatureWeights, ModelArtifact};
    use crate::training::{dataset, NormalizationCaps};
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn reference_artifact() -> ModelArtifact {
        ModelArtifact {
            version: "v2-test".to_string(),
            bias: 0.1,
            caps: NormalizationCaps {
                power_kw_max: 100.0,
                n_connectors_max: 10.0,
                rating_max: 5.0,
            },
            weights: FeatureWeights::from_array([0.002, 0.05, 0.15, 0.10, 0.05, 0.10]),
        }
    }

    fn service_with(artifact: ModelArtifact, api_key: Option<&str>) -> ScoringService {
        let loaded = LoadedArtifact {
            artifact,
            path: PathBuf::from("model.json"),
            checksum: "0".repeat(64),
            size_bytes: 0,
            loaded_at: chrono::Utc::now(),
        };
        ScoringService::from_artifact(
            loaded,
            FeatureSchema::default(),
            api_key.map(str::to_string),
        )
    }

    fn request() -> FeatureRecord {
        FeatureRecord {
            power_kw: 50.0,
            n_connectors: 4.0,
            has_fast_dc: 1.0,
            rating: 4.5,
            has_geo: 1.0,
            usage_score: 1.0,
        }
    }

    #[test]
    fn test_reference_score() {
        let service = service_with(reference_artifact(), None);
        let response = service.score(&request()).unwrap();
        assert_relative_eq!(response.score, 0.511, epsilon = 1e-12);
        assert_eq!(response.model_version, "v2-test");
        assert_eq!(response.features_used, Feature::names());
    }

    #[test]
    fn test_negative_connectors_rejected() {
        let service = service_with(reference_artifact(), None);
        let record = FeatureRecord {
            n_connectors: -1.0,
            ..request()
        };
        let err = service.score(&record).unwrap_err();
        assert_eq!(err.field, "n_connectors");
    }

    #[test]
    fn test_score_is_clamped() {
        let mut high = reference_artifact();
        high.bias = 3.0;
        assert_eq!(service_with(high, None).score(&request()).unwrap().score, 1.0);

        let mut low = reference_artifact();
        low.bias = -3.0;
        assert_eq!(service_with(low, None).score(&request()).unwrap().score, 0.0);
    }

    #[test]
    fn test_authorization() {
        let open = service_with(reference_artifact(), None);
        assert!(open.authorize(None).is_ok());
        assert!(open.authorize(Some("anything")).is_ok());
        assert!(!open.auth_enabled());

        let locked = service_with(reference_artifact(), Some("s3cret"));
        assert!(locked.authorize(Some("s3cret")).is_ok());
        assert!(matches!(locked.authorize(None), Err(ScoringError::Unauthorized)));
        assert!(matches!(
            locked.authorize(Some("wrong")),
            Err(ScoringError::Unauthorized)
        ));
    }

    #[test]
    fn test_empty_key_disables_auth() {
        let service = service_with(reference_artifact(), Some(""));
        assert!(!service.auth_enabled());
    }

    #[test]
    fn test_start_fails_fast_without_artifact() {
        let dir = TempDir::new().unwrap();
        let config = ScoringConfig::new(dir.path().join("model.json"));
        let err = ScoringService::start(&config).unwrap_err();
        assert!(matches!(err, StartupError::ArtifactMissing(_)));
    }

    #[test]
    fn test_start_trains_when_configured() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("training_data.csv");
        dataset::write_csv(&dataset::synthesize(30, 9), &input).unwrap();

        let mut config = ScoringConfig::new(dir.path().join("model.json"));
        config.train_on_missing = Some(TrainingConfig::new(&input, "ignored.json"));

        let service = ScoringService::start(&config).unwrap();
        assert!(dir.path().join("model.json").exists());
        assert!(!dir.path().join("ignored.json").exists());
        assert_eq!(service.model_version(), training::DEFAULT_MODEL_VERSION);
        assert!(service.training_report().is_some());
    }

    #[test]
    fn test_start_loads_existing_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        artifact::save(&reference_artifact(), &path).unwrap();

        let service = ScoringService::start(&ScoringConfig::new(&path)).unwrap();
        assert_eq!(service.artifact().artifact, reference_artifact());
        assert!(service.training_report().is_none());
    }

    #[test]
    fn test_concurrent_scoring_is_consistent() {
        let service = Arc::new(service_with(reference_artifact(), None));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.score(&request()).unwrap().score)
            })
            .collect();
        for h in handles {
            assert_relative_eq!(h.join().unwrap(), 0.511, epsilon = 1e-12);
        }
    }
}
