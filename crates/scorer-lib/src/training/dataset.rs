//! Training data boundary
//!
//! Reads the delimited training file into strict typed rows. Rows that do not
//! parse are counted as malformed, rows that parse but fall outside the
//! feature schema are counted as rejected; neither reaches the normalizer.

use crate::error::DataError;
use crate::schema::{Feature, FeatureRecord, FeatureSchema, Sample};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Name of the target column
pub const LABEL_COLUMN: &str = "label";

/// Columns that must be present in the header
const REQUIRED_COLUMNS: [&str; 6] = [
    "power_kw",
    "n_connectors",
    "has_fast_dc",
    "rating",
    "has_geo",
    LABEL_COLUMN,
];

/// One CSV row
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainingRow {
    power_kw: f64,
    n_connectors: f64,
    has_fast_dc: f64,
    rating: f64,
    has_geo: f64,
    #[serde(default)]
    usage_score: f64,
    label: f64,
}

impl TrainingRow {
    fn record(&self) -> FeatureRecord {
        FeatureRecord {
            power_kw: self.power_kw,
            n_connectors: self.n_connectors,
            has_fast_dc: self.has_fast_dc,
            rating: self.rating,
            has_geo: self.has_geo,
            usage_score: self.usage_score,
        }
    }
}

impl From<&Sample> for TrainingRow {
    fn from(sample: &Sample) -> Self {
        let r = sample.record();
        Self {
            power_kw: r.power_kw,
            n_connectors: r.n_connectors,
            has_fast_dc: r.has_fast_dc,
            rating: r.rating,
            has_geo: r.has_geo,
            usage_score: r.usage_score,
            label: sample.label,
        }
    }
}

/// Usable samples plus skip counts
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub samples: Vec<Sample>,
    /// Rows that failed to parse
    pub malformed: usize,
    /// Rows that parsed but violated the schema
    pub rejected: usize,
}

impl LoadedDataset {
    pub fn skipped(&self) -> usize {
        self.malformed + self.rejected
    }
}

/// Load training samples from a CSV file with a header row
pub fn load_csv(path: &Path, schema: &FeatureSchema) -> Result<LoadedDataset, DataError> {
    if !path.exists() {
        return Err(DataError::Missing(path.to_path_buf()));
    }

    let read_err = |source| DataError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    let headers = reader.headers().map_err(read_err)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::MissingColumn(column));
        }
    }

    let mut dataset = LoadedDataset {
        samples: Vec::new(),
        malformed: 0,
        rejected: 0,
    };

    for (idx, result) in reader.deserialize::<TrainingRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                debug!(row = idx + 1, error = %e, "Skipping malformed training row");
                dataset.malformed += 1;
                continue;
            }
        };

        let record = row.record();
        if let Err(e) = schema.validate(&record) {
            debug!(row = idx + 1, error = %e, "Skipping out-of-schema training row");
            dataset.rejected += 1;
            continue;
        }
        if !row.label.is_finite() || !(0.0..=1.0).contains(&row.label) {
            debug!(row = idx + 1, label = row.label, "Skipping row with label outside [0, 1]");
            dataset.rejected += 1;
            continue;
        }

        dataset.samples.push(Sample::new(record, row.label));
    }

    if dataset.samples.is_empty() {
        return Err(DataError::NoUsableRows {
            malformed: dataset.malformed,
            rejected: dataset.rejected,
        });
    }

    info!(
        path = %path.display(),
        samples = dataset.samples.len(),
        malformed = dataset.malformed,
        rejected = dataset.rejected,
        "Training data loaded"
    );
    Ok(dataset)
}

/// Write samples as CSV with the canonical header, creating missing parent directories
pub fn write_csv(samples: &[Sample], path: &Path) -> Result<(), DataError> {
    let write_err = |source: csv::Error| DataError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_err(e.into()))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    for sample in samples {
        writer.serialize(TrainingRow::from(sample)).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;
    Ok(())
}

/// Generate a synthetic station dataset with a known linear target
///
/// The target is `0.002·power + 0.05·connectors + 0.15·fast_dc + 0.10·rating
/// + 0.10·usage + 0.05·geo` plus uniform noise in ±0.05, clipped to [0,1].
pub fn synthesize(n: usize, seed: u64) -> Vec<Sample> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let record = FeatureRecord {
                power_kw: rng.gen_range(3.0..350.0),
                n_connectors: rng.gen_range(1..12) as f64,
                has_fast_dc: rng.gen_range(0..2) as f64,
                rating: rng.gen_range(2.5..5.0),
                has_geo: rng.gen_range(0..2) as f64,
                usage_score: rng.gen_range(0..2) as f64,
            };
            let signal = 0.002 * record.get(Feature::PowerKw)
                + 0.05 * record.get(Feature::NConnectors)
                + 0.15 * record.get(Feature::HasFastDc)
                + 0.10 * record.get(Feature::Rating)
                + 0.10 * record.get(Feature::UsageScore)
                + 0.05 * record.get(Feature::HasGeo);
            let noise = rng.gen_range(-0.05..0.05);
            Sample::new(record, (signal + noise).clamp(0.0, 1.0))
        })
        .collect()
}
