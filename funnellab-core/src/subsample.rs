//! Deterministic parameter subsampling.
//!
//! Picks which rows of a grid a stage actually executes. The choice is a
//! seeded random sample; the chosen indices are then sorted ascending so the
//! row loop keeps its cache-friendly order without changing *which* rows ran.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SubsampleError {
    #[error("subsample rate must be finite, got {0}")]
    InvalidRate(f64),
}

/// How many of `n` rows a rate selects.
///
/// `rate >= 1` selects all rows, `rate <= 0` none; otherwise
/// `max(1, round(n * rate))`, rounding half away from zero.
pub fn selected_count(n: usize, rate: f64) -> usize {
    if n == 0 || rate <= 0.0 || rate.is_nan() {
        return 0;
    }
    if rate >= 1.0 {
        return n;
    }
    let k = (n as f64 * rate).round() as usize;
    k.clamp(1, n)
}

/// Sorted indices of the rows selected out of `0..n`.
///
/// Same `(n, rate, seed)` always yields the same selection. For `rate >= 1`
/// the seed is ignored and the full range is returned.
pub fn subsample_indices(n: usize, rate: f64, seed: u64) -> Result<Vec<usize>, SubsampleError> {
    if !rate.is_finite() {
        return Err(SubsampleError::InvalidRate(rate));
    }
    let k = selected_count(n, rate);
    if k == n {
        return Ok((0..n).collect());
    }
    if k == 0 {
        return Ok(Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, n, k).into_vec();
    picked.sort_unstable();
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_rate_is_identity_regardless_of_seed() {
        assert_eq!(subsample_indices(5, 1.0, 1).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(subsample_indices(5, 1.7, 99).unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_or_negative_rate_is_empty() {
        assert!(subsample_indices(10, 0.0, 42).unwrap().is_empty());
        assert!(subsample_indices(10, -0.5, 42).unwrap().is_empty());
    }

    #[test]
    fn count_rounds_with_floor_of_one() {
        assert_eq!(selected_count(10, 0.3), 3);
        assert_eq!(selected_count(10, 0.01), 1);
        assert_eq!(selected_count(10, 0.25), 3);
        assert_eq!(selected_count(0, 0.5), 0);
        assert_eq!(selected_count(1000, 0.123), 123);
    }

    #[test]
    fn selection_is_sorted_unique_and_reproducible() {
        let a = subsample_indices(200, 0.1, 42).unwrap();
        let b = subsample_indices(200, 0.1, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(a.iter().all(|&i| i < 200));
    }

    #[test]
    fn different_seeds_usually_differ() {
        let a = subsample_indices(500, 0.1, 1).unwrap();
        let b = subsample_indices(500, 0.1, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn non_finite_rate_is_rejected() {
        assert_eq!(
            subsample_indices(10, f64::NAN, 0).unwrap_err().to_string(),
            "subsample rate must be finite, got NaN"
        );
        assert!(subsample_indices(10, f64::INFINITY, 0).is_err());
    }
}
