//! Indicator library: pure numeric transforms over OHLC columns.
//!
//! Every function returns a series of the input length with `f64::NAN` as the
//! undefined sentinel during warmup. Window lengths are signed so that
//! non-positive lengths coming from a parameter grid can be passed straight
//! through; they produce all-undefined output instead of an error.

pub mod atr;
pub mod cache;
pub mod donchian;
pub mod sma;

use thiserror::Error;

pub use atr::{atr_wilder, true_range};
pub use cache::{CacheStats, DonchianPair, IndicatorCache};
pub use donchian::{donchian, rolling_max, rolling_max_scan, rolling_min, rolling_min_scan};
pub use sma::{prefix_sums, rolling_mean, sma_at, PrefixSums};

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("OHLC column lengths differ: high={high}, low={low}, close={close}")]
    LengthMismatch { high: usize, low: usize, close: usize },
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
