//! Core data models for station scoring
//!
//! The attribute order defined by [`Feature::ALL`] is shared by every weight
//! vector, every normalization step and the artifact's weight map.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Number of station attributes
pub const NUM_FEATURES: usize = 6;

/// Upper bound of the rating scale
pub const RATING_SCALE_MAX: f64 = 5.0;

/// Station attributes in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PowerKw,
    NConnectors,
    HasFastDc,
    Rating,
    HasGeo,
    UsageScore,
}

impl Feature {
    pub const ALL: [Feature; NUM_FEATURES] = [
        Feature::PowerKw,
        Feature::NConnectors,
        Feature::HasFastDc,
        Feature::Rating,
        Feature::HasGeo,
        Feature::UsageScore,
    ];

    /// Wire name used in requests, CSV headers and the artifact
    pub fn name(&self) -> &'static str {
        match self {
            Feature::PowerKw => "power_kw",
            Feature::NConnectors => "n_connectors",
            Feature::HasFastDc => "has_fast_dc",
            Feature::Rating => "rating",
            Feature::HasGeo => "has_geo",
            Feature::UsageScore => "usage_score",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Feature names in canonical order
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|f| f.name().to_string()).collect()
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw station attributes as named fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub power_kw: f64,
    pub n_connectors: f64,
    pub has_fast_dc: f64,
    pub rating: f64,
    pub has_geo: f64,
    pub usage_score: f64,
}

impl FeatureRecord {
    /// Attributes in canonical order
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.power_kw,
            self.n_connectors,
            self.has_fast_dc,
            self.rating,
            self.has_geo,
            self.usage_score,
        ]
    }

    pub fn from_array(values: [f64; NUM_FEATURES]) -> Self {
        Self {
            power_kw: values[0],
            n_connectors: values[1],
            has_fast_dc: values[2],
            rating: values[3],
            has_geo: values[4],
            usage_score: values[5],
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.to_array()[feature.index()]
    }
}

/// A training example: attributes plus a continuous target in [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub features: [f64; NUM_FEATURES],
    pub label: f64,
}

impl Sample {
    pub fn new(record: FeatureRecord, label: f64) -> Self {
        Self {
            features: record.to_array(),
            label,
        }
    }

    pub fn record(&self) -> FeatureRecord {
        FeatureRecord::from_array(self.features)
    }
}

/// Accepted domain for `usage_score`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageScoreDomain {
    /// Any value in [0,1]
    #[default]
    Continuous,
    /// Exactly 0 or 1
    Binary,
}

/// Valid ranges for station attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    #[serde(default)]
    pub usage_score: UsageScoreDomain,
}

impl FeatureSchema {
    pub fn new(usage_score: UsageScoreDomain) -> Self {
        Self { usage_score }
    }

    /// Check every attribute in canonical order, reporting the first bad field
    pub fn validate(&self, record: &FeatureRecord) -> Result<(), ValidationError> {
        for feature in Feature::ALL {
            self.validate_field(feature, record.get(feature))?;
        }
        Ok(())
    }

    /// Check a single attribute value
    pub fn validate_field(&self, feature: Feature, value: f64) -> Result<(), ValidationError> {
        let (ok, expected) = match feature {
            Feature::PowerKw => (value.is_finite() && value >= 0.0, "a number >= 0"),
            Feature::NConnectors => (
                value.is_finite() && value >= 0.0 && value.fract() == 0.0,
                "an integer >= 0",
            ),
            Feature::HasFastDc | Feature::HasGeo => (is_flag(value), "0 or 1"),
            Feature::Rating => (
                value.is_finite() && (0.0..=RATING_SCALE_MAX).contains(&value),
                "a number in [0, 5]",
            ),
            Feature::UsageScore => match self.usage_score {
                UsageScoreDomain::Continuous => (
                    value.is_finite() && (0.0..=1.0).contains(&value),
                    "a number in [0, 1]",
                ),
                UsageScoreDomain::Binary => (is_flag(value), "0 or 1"),
            },
        };

        if ok {
            Ok(())
        } else {
            Err(ValidationError {
                field: feature.name(),
                value,
                expected,
            })
        }
    }
}

fn is_flag(value: f64) -> bool {
    value == 0.0 || value == 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> FeatureRecord {
        FeatureRecord {
            power_kw: 50.0,
            n_connectors: 4.0,
            has_fast_dc: 1.0,
            rating: 4.5,
            has_geo: 1.0,
            usage_score: 1.0,
        }
    }

    #[test]
    fn test_feature_order_is_canonical() {
        let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec!["power_kw", "n_connectors", "has_fast_dc", "rating", "has_geo", "usage_score"]
        );
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_record_array_order() {
        let record = valid_record();
        assert_eq!(record.to_array(), [50.0, 4.0, 1.0, 4.5, 1.0, 1.0]);
        assert_eq!(FeatureRecord::from_array(record.to_array()), record);
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(FeatureSchema::default().validate(&valid_record()).is_ok());
    }

    #[test]
    fn test_negative_connectors_rejected() {
        let record = FeatureRecord {
            n_connectors: -1.0,
            ..valid_record()
        };
        let err = FeatureSchema::default().validate(&record).unwrap_err();
        assert_eq!(err.field, "n_connectors");
    }

    #[test]
    fn test_fractional_connectors_rejected() {
        let record = FeatureRecord {
            n_connectors: 2.5,
            ..valid_record()
        };
        let err = FeatureSchema::default().validate(&record).unwrap_err();
        assert_eq!(err.field, "n_connectors");
    }

    #[test]
    fn test_flags_must_be_binary() {
        let record = FeatureRecord {
            has_geo: 0.5,
            ..valid_record()
        };
        let err = FeatureSchema::default().validate(&record).unwrap_err();
        assert_eq!(err.field, "has_geo");
    }

    #[test]
    fn test_rating_out_of_range() {
        let record = FeatureRecord {
            rating: 5.5,
            ..valid_record()
        };
        let err = FeatureSchema::default().validate(&record).unwrap_err();
        assert_eq!(err.field, "rating");
        assert!(err.to_string().contains("rating"));
    }

    #[test]
    fn test_usage_score_domains() {
        let record = FeatureRecord {
            usage_score: 0.4,
            ..valid_record()
        };
        assert!(FeatureSchema::new(UsageScoreDomain::Continuous)
            .validate(&record)
            .is_ok());
        let err = FeatureSchema::new(UsageScoreDomain::Binary)
            .validate(&record)
            .unwrap_err();
        assert_eq!(err.field, "usage_score");
    }

    #[test]
    fn test_non_finite_rejected() {
        let record = FeatureRecord {
            power_kw: f64::INFINITY,
            ..valid_record()
        };
        let err = FeatureSchema::default().validate(&record).unwrap_err();
        assert_eq!(err.field, "power_kw");
    }

    #[test]
    fn test_first_offending_field_reported() {
        let record = FeatureRecord {
            power_kw: -3.0,
            rating: 9.0,
            ..valid_record()
        };
        let err = FeatureSchema::default().validate(&record).unwrap_err();
        assert_eq!(err.field, "power_kw");
    }
}
