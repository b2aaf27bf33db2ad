//! Deterministic train/test partitioning
//!
//! A seeded Xoshiro256++ permutation of sample indices; the first
//! `test_size` permuted indices form the test fold.

use crate::error::InsufficientDataError;
use crate::schema::Sample;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Default held-out fraction
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default permutation seed
pub const DEFAULT_SEED: u64 = 42;

/// Indices of the two folds, in permutation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of held-out samples for `n` samples
///
/// Callers guarantee `n >= 2`.
fn test_size(n: usize, test_fraction: f64) -> usize {
    let raw = (n as f64 * test_fraction).round();
    let raw = if raw.is_finite() && raw > 0.0 { raw as usize } else { 0 };
    raw.clamp(1, n - 1)
}

/// Partition `n` indices into train and test folds
pub fn split(n: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices, InsufficientDataError> {
    if n < 2 {
        return Err(InsufficientDataError { available: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(test_size(n, test_fraction));
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Partition samples into `(train, test)`
pub fn split_samples(
    samples: &[Sample],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<Sample>, Vec<Sample>), InsufficientDataError> {
    let folds = split(samples.len(), test_fraction, seed)?;
    let pick = |idx: &[usize]| idx.iter().map(|&i| samples[i]).collect::<Vec<_>>();
    Ok((pick(&folds.train), pick(&folds.test)))
}
