//! Remote scoring command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, FeatureRecord};
use crate::output::{color_score, print_json, print_table, OutputFormat};

/// Row for the score table
#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Model")]
    model_version: String,
    #[tabled(rename = "Features")]
    features: String,
}

/// Ask the service to score one station
pub async fn score(client: &ApiClient, record: &FeatureRecord, format: OutputFormat) -> Result<()> {
    let response = client.score(record).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_table(vec![ScoreRow {
            score: color_score(response.score),
            model_version: response.model_version.clone(),
            features: response.features_used.len().to_string(),
        }]),
    }

    Ok(())
}
