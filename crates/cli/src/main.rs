//! Station Scorer CLI
//!
//! A command-line tool for training scoring models, generating synthetic
//! training data, inspecting artifacts and querying the scoring service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{model, score, train};
use scorer_lib::{
    training::{self, TrainingConfig},
    FeatureRecord, FeatureSchema, UsageScoreDomain,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_ARTIFACT_PATH: &str = "ml/models/model.json";
const DEFAULT_TRAINING_DATA: &str = "ml/data/training_data.csv";

/// Station Scorer CLI
#[derive(Parser)]
#[command(name = "ssc")]
#[command(author, version, about = "CLI for the EV Station Scorer", long_about = None)]
pub struct Cli {
    /// Scoring service URL (can also be set via SSC_API_URL env var)
    #[arg(long, env = "SSC_API_URL")]
    pub api_url: Option<String>,

    /// Shared secret for the scoring service
    #[arg(long, env = "SSC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from a CSV file and write its artifact
    Train {
        /// Training CSV
        #[arg(long, short, default_value = DEFAULT_TRAINING_DATA)]
        input: PathBuf,

        /// Artifact destination
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Version tag stored in the artifact
        #[arg(long, default_value = training::DEFAULT_MODEL_VERSION)]
        model_version: String,

        /// Fraction of samples held out for evaluation
        #[arg(long, default_value_t = training::DEFAULT_TEST_FRACTION)]
        test_fraction: f64,

        /// Seed for the train/test split
        #[arg(long, default_value_t = training::DEFAULT_SEED)]
        seed: u64,

        /// Ridge regularization strength
        #[arg(long, default_value_t = training::DEFAULT_LAMBDA)]
        lambda: f64,

        /// Decision threshold for evaluation
        #[arg(long, default_value_t = training::DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Require usage_score to be exactly 0 or 1
        #[arg(long)]
        binary_usage: bool,

        /// POST the run summary to this URL
        #[arg(long, env = "SSC_RUN_LOG_URL")]
        run_log_url: Option<String>,

        /// Append the run summary to this JSON-lines file
        #[arg(long, conflicts_with = "run_log_url")]
        run_log_file: Option<PathBuf>,
    },

    /// Write a synthetic training set
    Synthesize {
        /// Destination CSV
        #[arg(long, short, default_value = DEFAULT_TRAINING_DATA)]
        output: PathBuf,

        /// Number of rows
        #[arg(long, default_value_t = 250)]
        rows: usize,

        /// Random seed
        #[arg(long, default_value_t = training::DEFAULT_SEED)]
        seed: u64,
    },

    /// Show the contents of a local model artifact
    Inspect {
        /// Artifact path
        path: Option<PathBuf>,
    },

    /// Show the model the scoring service is serving
    Version,

    /// Score one station against the scoring service
    Score {
        #[arg(long)]
        power_kw: f64,

        #[arg(long)]
        n_connectors: f64,

        /// 1 if the station has DC fast charging
        #[arg(long, default_value_t = 0.0)]
        has_fast_dc: f64,

        #[arg(long)]
        rating: f64,

        /// 1 if the station has coordinates
        #[arg(long, default_value_t = 0.0)]
        has_geo: f64,

        #[arg(long, default_value_t = 0.0)]
        usage_score: f64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer().compact())
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let profile = config::Config::load()?;
    let artifact_default = profile
        .artifact_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_PATH));

    match cli.command {
        Commands::Train {
            input,
            output,
            model_version,
            test_fraction,
            seed,
            lambda,
            threshold,
            binary_usage,
            run_log_url,
            run_log_file,
        } => {
            let mut config = TrainingConfig::new(input, output.unwrap_or(artifact_default));
            config.model_version = model_version;
            config.test_fraction = test_fraction;
            config.seed = seed;
            config.lambda = lambda;
            config.threshold = threshold;
            if binary_usage {
                config.schema = FeatureSchema::new(UsageScoreDomain::Binary);
            }
            let run_log = train::RunLogTarget {
                url: run_log_url,
                file: run_log_file,
            };
            train::train(&config, &run_log, cli.format).await?;
        }
        Commands::Synthesize { output, rows, seed } => {
            train::synthesize(&output, rows, seed)?;
        }
        Commands::Inspect { path } => {
            model::inspect(&path.unwrap_or(artifact_default), cli.format)?;
        }
        Commands::Version => {
            let client = api_client(cli.api_url, cli.api_key, &profile)?;
            model::remote_version(&client, cli.format).await?;
        }
        Commands::Score {
            power_kw,
            n_connectors,
            has_fast_dc,
            rating,
            has_geo,
            usage_score,
        } => {
            let client = api_client(cli.api_url, cli.api_key, &profile)?;
            let record = FeatureRecord {
                power_kw,
                n_connectors,
                has_fast_dc,
                rating,
                has_geo,
                usage_score,
            };
            score::score(&client, &record, cli.format).await?;
        }
    }

    Ok(())
}

/// Flags and environment win over the profile
fn api_client(
    api_url: Option<String>,
    api_key: Option<String>,
    profile: &config::Config,
) -> Result<client::ApiClient> {
    let url = api_url
        .or_else(|| profile.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let key = api_key.or_else(|| profile.api_key.clone());
    tracing::debug!(api_url = %url, authenticated = key.is_some(), "Using scoring service");
    client::ApiClient::new(&url, key)
}
