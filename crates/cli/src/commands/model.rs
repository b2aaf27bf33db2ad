//! Model artifact inspection commands

use anyhow::{Context, Result};
use scorer_lib::{
    artifact::{self, LoadedArtifact},
    training::{NormalizationCaps, TrainingReport},
    Feature,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_metric, format_coefficient, print_info, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the weights table
#[derive(Tabled)]
struct WeightRow {
    #[tabled(rename = "Feature")]
    feature: &'static str,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Cap")]
    cap: String,
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    path: String,
    checksum: &'a str,
    size_bytes: usize,
    artifact: &'a scorer_lib::ModelArtifact,
    training: Option<TrainingReport>,
}

/// Show the contents of a local model artifact
pub fn inspect(path: &Path, format: OutputFormat) -> Result<()> {
    let loaded = artifact::load(path)
        .with_context(|| format!("Failed to load artifact {}", path.display()))?;
    let training: Option<TrainingReport> = artifact::load_sidecar(path);

    match format {
        OutputFormat::Json => print_json(&InspectOutput {
            path: path.display().to_string(),
            checksum: &loaded.checksum,
            size_bytes: loaded.size_bytes,
            artifact: &loaded.artifact,
            training,
        }),
        OutputFormat::Table => {
            print_artifact(&loaded);
            match &training {
                Some(report) => print_training(report),
                None => print_warning("No training report next to this artifact"),
            }
            Ok(())
        }
    }
}

/// Show the model the scoring service is serving
pub async fn remote_version(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.version().await?;

    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Table => {
            println!("Model version: {}", info.model_version);
            println!("Checksum: {}", info.checksum);
            println!("Features: {}", info.features.join(", "));
            println!("usage_score domain: {:?}", info.schema.usage_score);
            if let Some(loaded_at) = &info.loaded_at {
                println!("Loaded at: {}", loaded_at);
            }
            print_caps(&info.caps);
            if let Some(report) = &info.training {
                print_training(report);
            }
            Ok(())
        }
    }
}

fn print_artifact(loaded: &LoadedArtifact) {
    let artifact = &loaded.artifact;
    println!("Model version: {}", artifact.version);
    println!("Path: {}", loaded.path.display());
    println!("Checksum: {}", loaded.checksum);
    println!("Bias: {}", format_coefficient(artifact.bias));

    let weights = artifact.weights.to_array();
    let rows: Vec<WeightRow> = Feature::ALL
        .iter()
        .map(|f| WeightRow {
            feature: f.name(),
            weight: format_coefficient(weights[f.index()]),
            cap: cap_for(*f, &artifact.caps),
        })
        .collect();
    print_table(rows);
}

fn print_caps(caps: &NormalizationCaps) {
    println!(
        "Caps: power_kw {:.2}, n_connectors {:.2}, rating {:.2}",
        caps.power_kw_max, caps.n_connectors_max, caps.rating_max
    );
}

fn cap_for(feature: Feature, caps: &NormalizationCaps) -> String {
    match feature {
        Feature::PowerKw => format!("{:.2}", caps.power_kw_max),
        Feature::NConnectors => format!("{:.2}", caps.n_connectors_max),
        Feature::Rating => format!("{:.2}", caps.rating_max),
        _ => "-".to_string(),
    }
}

fn print_training(report: &TrainingReport) {
    print_info(&format!(
        "Trained {} on {} samples ({} held out)",
        report.trained_at.format("%Y-%m-%d %H:%M"),
        report.n_train,
        report.n_test
    ));
    println!(
        "accuracy {}  precision {}  recall {}",
        color_metric(report.metrics.accuracy),
        color_metric(report.metrics.precision),
        color_metric(report.metrics.recall)
    );
}
