//! Feature normalization with outlier capping
//!
//! Caps are derived once per training run from the training fold and stored in
//! the artifact, so serving rescales requests exactly as training did.

use crate::error::DataError;
use crate::schema::{Feature, Sample, NUM_FEATURES, RATING_SCALE_MAX};
use serde::{Deserialize, Serialize};

/// Percentile used for the power and connector caps
pub const CAP_PERCENTILE: f64 = 95.0;

/// Lower bound applied to the connector cap and to every divisor
const MIN_CAP: f64 = 1.0;

/// Upper bounds used to rescale raw attributes into [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationCaps {
    pub power_kw_max: f64,
    pub n_connectors_max: f64,
    pub rating_max: f64,
}

/// Compute caps from the samples used to fit the model
pub fn compute_caps(train: &[Sample]) -> Result<NormalizationCaps, DataError> {
    if train.is_empty() {
        return Err(DataError::Empty);
    }

    let power: Vec<f64> = train
        .iter()
        .map(|s| s.features[Feature::PowerKw.index()])
        .collect();
    let connectors: Vec<f64> = train
        .iter()
        .map(|s| s.features[Feature::NConnectors.index()])
        .collect();

    Ok(NormalizationCaps {
        power_kw_max: percentile(&power, CAP_PERCENTILE),
        n_connectors_max: percentile(&connectors, CAP_PERCENTILE).max(MIN_CAP),
        rating_max: RATING_SCALE_MAX,
    })
}

/// Rescale one attribute vector into [0,1]^6
///
/// Out-of-range inputs are clipped, never rejected.
pub fn normalize(features: &[f64; NUM_FEATURES], caps: &NormalizationCaps) -> [f64; NUM_FEATURES] {
    let mut out = *features;
    out[Feature::PowerKw.index()] =
        features[Feature::PowerKw.index()] / caps.power_kw_max.max(MIN_CAP);
    out[Feature::NConnectors.index()] =
        features[Feature::NConnectors.index()] / caps.n_connectors_max.max(MIN_CAP);
    out[Feature::Rating.index()] = features[Feature::Rating.index()] / caps.rating_max.max(MIN_CAP);

    for value in out.iter_mut() {
        *value = clamp01(*value);
    }
    out
}

/// Normalize a batch of samples, keeping labels untouched
pub fn apply(samples: &[Sample], caps: &NormalizationCaps) -> Vec<Sample> {
    samples
        .iter()
        .map(|s| Sample {
            features: normalize(&s.features, caps),
            label: s.label,
        })
        .collect()
}

/// Clamp into [0,1], mapping NaN to 0
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Percentile with linear interpolation between closest ranks
pub(crate) fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
