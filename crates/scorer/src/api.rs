//! HTTP API for scoring, model version, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use scorer_lib::{
    observability::{ScorerMetrics, StructuredLogger},
    training::{NormalizationCaps, TrainingReport},
    Feature, FeatureRecord, FeatureSchema, ScoringError, ScoringService,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-scorer-key";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScoringService>,
    pub metrics: ScorerMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(service: ScoringService, metrics: ScorerMetrics, logger: StructuredLogger) -> Self {
        metrics.set_model_version(service.model_version(), &service.artifact().checksum);
        Self {
            service: Arc::new(service),
            metrics,
            logger,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct VersionResponse<'a> {
    model_version: &'a str,
    checksum: &'a str,
    features: Vec<String>,
    caps: NormalizationCaps,
    schema: FeatureSchema,
    loaded_at: DateTime<Utc>,
    training: Option<&'a TrainingReport>,
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    model_version: &'a str,
}

/// Score one station; the key is checked before the body is parsed
async fn score(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<FeatureRecord>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let token = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state.service.authorize(token) {
        return error_response(&state, e);
    }

    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            state.metrics.inc_validation_rejections();
            debug!(error = %rejection.body_text(), "Malformed score request");
            let body = ErrorBody {
                error: rejection.body_text(),
                field: None,
            };
            return (rejection.status(), Json(body)).into_response();
        }
    };

    match state.service.score(&record) {
        Ok(response) => {
            state
                .metrics
                .observe_score_latency(start.elapsed().as_secs_f64());
            state.metrics.inc_scores_served();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&state, e.into()),
    }
}

fn error_response(state: &AppState, err: ScoringError) -> Response {
    match err {
        ScoringError::Unauthorized => {
            state.metrics.inc_unauthorized();
            state.logger.log_unauthorized();
            let body = ErrorBody {
                error: ScoringError::Unauthorized.to_string(),
                field: None,
            };
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
        ScoringError::Validation(e) => {
            state.metrics.inc_validation_rejections();
            state.logger.log_score_rejected(e.field, e.expected);
            let body = ErrorBody {
                error: e.to_string(),
                field: Some(e.field),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    }
}

/// Loaded model details
async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let loaded = state.service.artifact();
    Json(VersionResponse {
        model_version: &loaded.artifact.version,
        checksum: &loaded.checksum,
        features: Feature::names(),
        caps: loaded.artifact.caps,
        schema: *state.service.schema(),
        loaded_at: loaded.loaded_at,
        training: state.service.training_report(),
    })
    .into_response()
}

/// Health check; the model is loaded before the listener binds
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        model_version: state.service.model_version(),
    })
    .into_response()
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/score", post(score))
        .route("/version", get(version))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
