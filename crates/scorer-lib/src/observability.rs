//! Observability infrastructure for the scoring service
//!
//! Provides:
//! - Prometheus metrics (score latency, served/rejected counts, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram, IntCounter,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for score latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000005, 0.00001, 0.000025, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.005, 0.01,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ScorerMetricsInner> = OnceLock::new();

struct ScorerMetricsInner {
    score_latency_seconds: Histogram,
    scores_served: IntCounter,
    validation_rejections: IntCounter,
    unauthorized_requests: IntCounter,
    model_version_info: GaugeVec,
}

impl ScorerMetricsInner {
    fn new() -> Self {
        Self {
            score_latency_seconds: register_histogram!(
                "station_scorer_score_latency_seconds",
                "Time spent validating and scoring a station",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register score_latency_seconds"),

            scores_served: register_int_counter!(
                "station_scorer_scores_served_total",
                "Total number of scores returned"
            )
            .expect("Failed to register scores_served"),

            validation_rejections: register_int_counter!(
                "station_scorer_validation_rejections_total",
                "Total number of scoring requests rejected by schema validation"
            )
            .expect("Failed to register validation_rejections"),

            unauthorized_requests: register_int_counter!(
                "station_scorer_unauthorized_requests_total",
                "Total number of scoring requests with a missing or wrong key"
            )
            .expect("Failed to register unauthorized_requests"),

            model_version_info: register_gauge_vec!(
                "station_scorer_model_version_info",
                "Information about the loaded model artifact",
                &["version", "checksum"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Scorer metrics for Prometheus exposition
///
/// Cloning is free; every clone shares the process-wide metrics.
#[derive(Clone)]
pub struct ScorerMetrics {
    _private: (),
}

impl Default for ScorerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScorerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ScorerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ScorerMetricsInner {
        GLOBAL_METRICS.get_or_init(ScorerMetricsInner::new)
    }

    pub fn observe_score_latency(&self, duration_secs: f64) {
        self.inner().score_latency_seconds.observe(duration_secs);
    }

    pub fn inc_scores_served(&self) {
        self.inner().scores_served.inc();
    }

    pub fn inc_validation_rejections(&self) {
        self.inner().validation_rejections.inc();
    }

    pub fn inc_unauthorized(&self) {
        self.inner().unauthorized_requests.inc();
    }

    /// Replace the advertised model version
    pub fn set_model_version(&self, version: &str, checksum: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, checksum])
            .set(1.0);
    }
}

/// Event-tagged logging for the scoring service
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, service_version: &str, model_version: &str, auth_enabled: bool) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %service_version,
            model_version = %model_version,
            auth_enabled = auth_enabled,
            "Station scorer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Station scorer shutting down"
        );
    }

    pub fn log_model_loaded(&self, version: &str, checksum: &str, path: &str) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model_version = %version,
            checksum = %checksum,
            path = %path,
            "Model artifact loaded"
        );
    }

    pub fn log_training_on_startup(&self, input: &str) {
        warn!(
            event = "training_on_startup",
            service = %self.service,
            input = %input,
            "No model artifact found, training before serving"
        );
    }

    pub fn log_score_rejected(&self, field: &str, reason: &str) {
        info!(
            event = "score_rejected",
            service = %self.service,
            field = %field,
            reason = %reason,
            "Scoring request failed validation"
        );
    }

    pub fn log_unauthorized(&self) {
        warn!(
            event = "score_unauthorized",
            service = %self.service,
            "Scoring request presented a missing or wrong key"
        );
    }
}
