//! Service configuration

use anyhow::{Context, Result};
use scorer_lib::{FeatureSchema, ScoringConfig, TrainingConfig, UsageScoreDomain};
use serde::Deserialize;
use std::path::PathBuf;

/// Base name of the optional config file (`station-scorer.toml`, `.json`, `.yaml`)
pub const CONFIG_FILE_STEM: &str = "station-scorer";

/// Environment prefix, e.g. `SCORER_ARTIFACT_PATH`
pub const ENV_PREFIX: &str = "SCORER";

/// Scoring service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP port for scoring, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Model artifact location
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    /// Shared secret expected in `x-scorer-key`; unset or empty disables the check
    #[serde(default)]
    pub api_key: Option<String>,

    /// CSV used when the artifact is missing and `train_on_missing` is set
    #[serde(default)]
    pub training_data: Option<PathBuf>,

    #[serde(default)]
    pub train_on_missing: bool,

    /// Version tag for artifacts trained at startup
    #[serde(default = "default_model_version")]
    pub model_version: String,

    #[serde(default)]
    pub usage_score: UsageScoreDomain,
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("ml/models/model.json")
}

fn default_model_version() -> String {
    scorer_lib::training::DEFAULT_MODEL_VERSION.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            artifact_path: default_artifact_path(),
            api_key: None,
            training_data: None,
            train_on_missing: false,
            model_version: default_model_version(),
            usage_score: UsageScoreDomain::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the optional config file, then the environment
    pub fn load() -> Result<Self> {
        Self::load_from(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_from(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE_STEM).required(false))
            .add_source(env)
            .build()
            .context("Failed to read service configuration")?;

        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    /// Settings handed to the scoring service
    pub fn scoring_config(&self) -> ScoringConfig {
        let train_on_missing = match (&self.training_data, self.train_on_missing) {
            (Some(input), true) => {
                let mut training = TrainingConfig::new(input, &self.artifact_path);
                training.model_version = self.model_version.clone();
                training.schema = self.schema();
                Some(training)
            }
            _ => None,
        };

        ScoringConfig {
            artifact_path: self.artifact_path.clone(),
            api_key: self.api_key.clone(),
            schema: self.schema(),
            train_on_missing,
        }
    }

    fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.usage_score)
    }
}
