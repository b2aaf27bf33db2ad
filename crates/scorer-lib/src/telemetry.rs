//! Best-effort run-log sinks
//!
//! The training pipeline hands a [`RunSummary`] to a [`RunLogSink`] after the
//! artifact is persisted. Sink failures are logged by the caller and never
//! fail the run.

use crate::error::TelemetryError;
use crate::training::EvaluationMetrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Default timeout for the HTTP sink
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Record posted after a successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub model_version: String,
    pub samples_used: usize,
    pub metrics: EvaluationMetrics,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Destination for training run summaries
#[async_trait]
pub trait RunLogSink: Send + Sync {
    /// Persist or forward one summary
    async fn record(&self, summary: &RunSummary) -> Result<(), TelemetryError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Sink that drops every summary
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl RunLogSink for NoopSink {
    async fn record(&self, _summary: &RunSummary) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Appends one JSON line per run
#[derive(Debug, Clone)]
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RunLogSink for JsonlFileSink {
    async fn record(&self, summary: &RunSummary) -> Result<(), TelemetryError> {
        let mut line = serde_json::to_vec(summary)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), "Run summary appended");
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// POSTs the summary as JSON to an external record store
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RunLogSink for HttpSink {
    async fn record(&self, summary: &RunSummary) -> Result<(), TelemetryError> {
        let response = self.client.post(&self.endpoint).json(summary).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status.as_u16()));
        }

        debug!(endpoint = %self.endpoint, "Run summary posted");
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
