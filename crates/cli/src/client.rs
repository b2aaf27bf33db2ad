//! API client for communicating with the scoring service

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub use scorer_lib::{FeatureRecord, ScoreResponse};

/// Header carrying the shared secret
const API_KEY_HEADER: &str = "x-scorer-key";

/// API client for the scoring service
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .with_key(self.client.get(url))
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .with_key(self.client.post(url))
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    error,
                    field: Some(field),
                }) => anyhow::bail!("API error ({}): {} [field: {}]", status, error, field),
                Ok(ErrorResponse { error, field: None }) => {
                    anyhow::bail!("API error ({}): {}", status, error)
                }
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }

    /// Score one station
    pub async fn score(&self, record: &FeatureRecord) -> Result<ScoreResponse> {
        self.post("score", record).await
    }

    /// Details of the model the service is serving
    pub async fn version(&self) -> Result<VersionInfo> {
        self.get("version").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub model_version: String,
    pub checksum: String,
    pub features: Vec<String>,
    pub caps: scorer_lib::NormalizationCaps,
    #[serde(default)]
    pub schema: scorer_lib::FeatureSchema,
    #[serde(default)]
    pub loaded_at: Option<String>,
    #[serde(default)]
    pub training: Option<scorer_lib::TrainingReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> FeatureRecord {
        FeatureRecord {
            power_kw: 50.0,
            n_connectors: 4.0,
            has_fast_dc: 1.0,
            rating: 4.5,
            has_geo: 1.0,
            usage_score: 1.0,
        }
    }

    #[tokio::test]
    async fn test_score_sends_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/score")
            .match_header("x-scorer-key", "s3cret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"score":0.511,"model_version":"v2-test","features_used":["power_kw"]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), Some("s3cret".to_string())).unwrap();
        let response = client.score(&station()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.model_version, "v2-test");
        assert!((response.score - 0.511).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_validation_error_names_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/score")
            .with_status(422)
            .with_body(r#"{"error":"n_connectors must be an integer >= 0","field":"n_connectors"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), None).unwrap();
        let err = client.score(&station()).await.unwrap_err().to_string();
        assert!(err.contains("422"));
        assert!(err.contains("[field: n_connectors]"));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/score")
            .with_status(401)
            .with_body(r#"{"error":"invalid key"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), Some("wrong".to_string())).unwrap();
        let err = client.score(&station()).await.unwrap_err().to_string();
        assert!(err.contains("invalid key"));
    }

    #[tokio::test]
    async fn test_version_reads_schema_and_load_time() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/version")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model_version":"v2-test","checksum":"abc","features":["power_kw"],
                "caps":{"power_kw_max":100.0,"n_connectors_max":4.0,"rating_max":5.0},
                "schema":{"usage_score":"binary"},"loaded_at":"2026-10-16T08:00:00Z","training":null}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), None).unwrap();
        let info = client.version().await.unwrap();
        assert_eq!(info.model_version, "v2-test");
        assert_eq!(info.schema.usage_score, scorer_lib::UsageScoreDomain::Binary);
        assert_eq!(info.loaded_at.as_deref(), Some("2026-10-16T08:00:00Z"));
        assert!(info.training.is_none());
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url", None).is_err());
    }
}
