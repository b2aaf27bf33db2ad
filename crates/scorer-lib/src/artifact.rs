//! Versioned model artifact persistence
//!
//! This module provides:
//! - The JSON artifact shared by training and serving
//! - Atomic full-overwrite saves (temp file, fsync, rename)
//! - SHA256 checksums of the stored bytes for traceability
//! - The metrics sidecar written next to the artifact

use crate::error::ArtifactError;
use crate::schema::{Feature, NUM_FEATURES};
use crate::training::{LinearFit, NormalizationCaps};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-feature weights keyed by the canonical feature names
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureWeights {
    pub power_kw: f64,
    pub n_connectors: f64,
    pub has_fast_dc: f64,
    pub rating: f64,
    pub has_geo: f64,
    pub usage_score: f64,
}

impl FeatureWeights {
    pub fn from_array(w: [f64; NUM_FEATURES]) -> Self {
        Self {
            power_kw: w[0],
            n_connectors: w[1],
            has_fast_dc: w[2],
            rating: w[3],
            has_geo: w[4],
            usage_score: w[5],
        }
    }

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
}

/// Fitted model: the contract between training and serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub bias: f64,
    pub caps: NormalizationCaps,
    pub weights: FeatureWeights,
}

impl ModelArtifact {
    pub fn new(version: impl Into<String>, fit: &LinearFit, caps: NormalizationCaps) -> Self {
        Self {
            version: version.into(),
            bias: fit.bias,
            caps,
            weights: FeatureWeights::from_array(fit.weights),
        }
    }

    /// Reject artifacts carrying NaN or infinite numbers
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let named = [
            ("bias", self.bias),
            ("caps.power_kw_max", self.caps.power_kw_max),
            ("caps.n_connectors_max", self.caps.n_connectors_max),
            ("caps.rating_max", self.caps.rating_max),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ArtifactError::NonFinite(name.to_string()));
            }
        }
        for (feature, w) in Feature::ALL.iter().zip(self.weights.to_array()) {
            if !w.is_finite() {
                return Err(ArtifactError::NonFinite(format!("weights.{}", feature.name())));
            }
        }
        Ok(())
    }
}

/// An artifact together with where and what it was loaded from
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub artifact: ModelArtifact,
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Write the artifact, fully replacing any previous one
pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<String, ArtifactError> {
    artifact.validate()?;
    let bytes = serde_json::to_vec_pretty(artifact)?;
    write_atomic(path, &bytes)?;

    let checksum = compute_checksum(&bytes);
    info!(
        version = %artifact.version,
        path = %path.display(),
        checksum = %checksum,
        "Model artifact written"
    );
    Ok(checksum)
}

/// Read and validate the artifact at `path`
pub fn load(path: &Path) -> Result<LoadedArtifact, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ModelArtifact =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    artifact.validate()?;

    let checksum = compute_checksum(&bytes);
    debug!(version = %artifact.version, checksum = %checksum, "Model artifact parsed");

    Ok(LoadedArtifact {
        artifact,
        path: path.to_path_buf(),
        checksum,
        size_bytes: bytes.len(),
        loaded_at: Utc::now(),
    })
}

/// Location of the metrics sidecar for an artifact
pub fn sidecar_path(artifact_path: &Path) -> PathBuf {
    let stem = artifact_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    artifact_path.with_file_name(format!("{}.metrics.json", stem))
}

/// Write the metrics sidecar next to the artifact
pub fn save_sidecar<T: Serialize>(artifact_path: &Path, report: &T) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec_pretty(report)?;
    write_atomic(&sidecar_path(artifact_path), &bytes)
}

/// Read the metrics sidecar, if there is a readable one
pub fn load_sidecar<T: DeserializeOwned>(artifact_path: &Path) -> Option<T> {
    let path = sidecar_path(artifact_path);
    let bytes = fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable metrics sidecar");
            None
        }
    }
}

/// Write to a temp sibling, sync, then rename over the destination
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let io_err = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp_path = path.with_extension("tmp");
    let written = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp_path, path));

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            debug!(path = %temp_path.display(), error = %cleanup, "Temp file not removed");
        }
        return Err(io_err(e));
    }
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
