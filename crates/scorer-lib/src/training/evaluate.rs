//! Threshold-based evaluation of continuous scores
//!
//! The model outputs a continuous score, but the score is used as a yes/no
//! reliability decision, so it is evaluated as a binary classifier. A value is
//! positive when it is strictly above the threshold.
//!
//! Metrics whose denominator is zero are `None`, which callers must keep
//! distinct from a score of zero.

use super::normalizer::clamp01;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default cut-point for both labels and predictions
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Confusion counts at a threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Evaluation of one held-out fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub rmse: Option<f64>,
    pub r2: Option<f64>,
    pub threshold: f64,
    pub n: usize,
}

impl EvaluationMetrics {
    /// Metrics for an empty fold
    pub fn undefined(threshold: f64) -> Self {
        Self {
            accuracy: None,
            precision: None,
            recall: None,
            rmse: None,
            r2: None,
            threshold,
            n: 0,
        }
    }
}

/// Count outcomes after clamping predictions into [0,1]
pub fn confusion(y_true: &[f64], y_pred: &[f64], threshold: f64) -> ConfusionCounts {
    let mut counts = ConfusionCounts::default();
    for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
        let actual = truth > threshold;
        let predicted = clamp01(pred) > threshold;
        match (actual, predicted) {
            (true, true) => counts.tp += 1,
            (false, false) => counts.tn += 1,
            (false, true) => counts.fp += 1,
            (true, false) => counts.fn_ += 1,
        }
    }
    counts
}

/// Score continuous predictions against continuous labels
pub fn evaluate(y_true: &[f64], y_pred: &[f64], threshold: f64) -> EvaluationMetrics {
    if y_true.len() != y_pred.len() {
        warn!(
            labels = y_true.len(),
            predictions = y_pred.len(),
            "Label and prediction counts differ, evaluating common prefix"
        );
    }

    let counts = confusion(y_true, y_pred, threshold);
    let n = counts.total();
    if n == 0 {
        return EvaluationMetrics::undefined(threshold);
    }

    let y_true = &y_true[..n];
    let clamped: Vec<f64> = y_pred[..n].iter().map(|&p| clamp01(p)).collect();

    EvaluationMetrics {
        accuracy: ratio(counts.tp + counts.tn, n),
        precision: ratio(counts.tp, counts.tp + counts.fp),
        recall: ratio(counts.tp, counts.tp + counts.fn_),
        rmse: Some(rmse(y_true, &clamped)),
        r2: r_squared(y_true, &clamped),
        threshold,
        n,
    }
}

fn ratio(num: usize, denom: usize) -> Option<f64> {
    if denom == 0 {
        None
    } else {
        Some(num as f64 / denom as f64)
    }
}

fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let sse: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    (sse / y_true.len() as f64).sqrt()
}

fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return None;
    }
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}
