//! Station Scorer - EV charging station scoring service
//!
//! Loads the current model artifact once at startup and serves scores
//! over HTTP until interrupted.

use anyhow::{Context, Result};
use scorer_lib::{
    observability::{ScorerMetrics, StructuredLogger},
    ScoringService,
};
use station_scorer::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting station-scorer");

    let config = ServiceConfig::load()?;
    info!(
        artifact = %config.artifact_path.display(),
        api_port = config.api_port,
        train_on_missing = config.train_on_missing,
        "Service configured"
    );

    let logger = StructuredLogger::new("station-scorer");
    let scoring_config = config.scoring_config();
    if let Some(training) = &scoring_config.train_on_missing {
        if !config.artifact_path.exists() {
            logger.log_training_on_startup(&training.input.display().to_string());
        }
    }

    // Training (if any) is blocking work; keep it off the runtime threads
    let service = tokio::task::spawn_blocking(move || ScoringService::start(&scoring_config))
        .await
        .context("Startup task panicked")?
        .context("Failed to load model artifact")?;

    let loaded = service.artifact();
    logger.log_model_loaded(
        &loaded.artifact.version,
        &loaded.checksum,
        &loaded.path.display().to_string(),
    );
    logger.log_startup(SERVICE_VERSION, service.model_version(), service.auth_enabled());

    let metrics = ScorerMetrics::new();
    let app_state = Arc::new(api::AppState::new(service, metrics, logger.clone()));

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
