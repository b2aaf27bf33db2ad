//! Training and data generation commands

use anyhow::{Context, Result};
use scorer_lib::{
    telemetry::{HttpSink, JsonlFileSink, NoopSink, RunLogSink, DEFAULT_SINK_TIMEOUT},
    training::{self, TrainingConfig, TrainingReport},
};
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::output::{
    color_metric, format_metric, print_info, print_json, print_success, print_table,
    OutputFormat,
};

/// Where to record the run summary
#[derive(Debug, Clone, Default)]
pub struct RunLogTarget {
    pub url: Option<String>,
    pub file: Option<PathBuf>,
}

impl RunLogTarget {
    fn sink(&self) -> Result<Box<dyn RunLogSink>> {
        if let Some(url) = &self.url {
            let sink = HttpSink::new(url.clone(), DEFAULT_SINK_TIMEOUT)
                .context("Failed to create run-log client")?;
            return Ok(Box::new(sink));
        }
        if let Some(path) = &self.file {
            return Ok(Box::new(JsonlFileSink::new(path)));
        }
        Ok(Box::new(NoopSink))
    }
}

/// Row for the metrics table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Train a model and write its artifact
pub async fn train(
    config: &TrainingConfig,
    run_log: &RunLogTarget,
    format: OutputFormat,
) -> Result<()> {
    let sink = run_log.sink()?;
    let report = training::run(config, sink.as_ref())
        .await
        .with_context(|| format!("Training from {} failed", config.input.display()))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &TrainingReport) {
    print_success(&format!(
        "Model {} written to {}",
        report.version,
        report.artifact_path.display()
    ));
    println!("Checksum: {}", report.checksum);
    println!(
        "Samples: {} train / {} test{}",
        report.n_train,
        report.n_test,
        if report.held_out {
            ""
        } else {
            " (evaluated on training set)"
        }
    );
    if report.malformed_rows + report.rejected_rows > 0 {
        print_info(&format!(
            "Skipped {} malformed and {} rejected rows",
            report.malformed_rows, report.rejected_rows
        ));
    }

    let metrics = &report.metrics;
    print_table(vec![
        MetricRow {
            name: "accuracy",
            value: color_metric(metrics.accuracy),
        },
        MetricRow {
            name: "precision",
            value: color_metric(metrics.precision),
        },
        MetricRow {
            name: "recall",
            value: color_metric(metrics.recall),
        },
        MetricRow {
            name: "rmse",
            value: format_metric(metrics.rmse),
        },
        MetricRow {
            name: "r2",
            value: format_metric(metrics.r2),
        },
    ]);
}

/// Write a synthetic training set
pub fn synthesize(output: &Path, rows: usize, seed: u64) -> Result<()> {
    let samples = training::synthesize(rows, seed);
    training::write_csv(&samples, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    print_success(&format!(
        "Wrote {} synthetic samples to {}",
        samples.len(),
        output.display()
    ));
    Ok(())
}
