//! Simple moving average over a prefix-sum table.
//!
//! Lookback: window - 1. Built for the Stage0 proxy, which needs many window
//! lengths over the same close series: the prefix table is computed once and
//! each window is then O(n).
//!
//! Non-finite inputs are kept out of the running sum and counted instead, so
//! a NaN bar only leaves the windows that contain it undefined.

use crate::domain::window_fits;

/// Cumulative sums and gap counts, each with a leading zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixSums {
    sums: Vec<f64>,
    gaps: Vec<u32>,
}

impl PrefixSums {
    pub fn len(&self) -> usize {
        self.sums.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-finite values among `arr[i + 1 - window ..= i]`.
    #[inline]
    pub fn gaps_in(&self, i: usize, window: usize) -> u32 {
        self.gaps[i + 1] - self.gaps[i + 1 - window]
    }
}

/// `sums[i] = arr[0] + ... + arr[i-1]` over the finite values only.
pub fn prefix_sums(arr: &[f64]) -> PrefixSums {
    let mut sums = Vec::with_capacity(arr.len() + 1);
    let mut gaps = Vec::with_capacity(arr.len() + 1);
    let (mut acc, mut missing) = (0.0, 0u32);
    sums.push(acc);
    gaps.push(missing);
    for &v in arr {
        if v.is_finite() {
            acc += v;
        } else {
            missing += 1;
        }
        sums.push(acc);
        gaps.push(missing);
    }
    PrefixSums { sums, gaps }
}

/// SMA value ending at bar `i` (inclusive); `NaN` when the window holds a gap.
#[inline]
pub fn sma_at(prefix: &PrefixSums, i: usize, window: usize) -> f64 {
    if prefix.gaps_in(i, window) > 0 {
        return f64::NAN;
    }
    (prefix.sums[i + 1] - prefix.sums[i + 1 - window]) / window as f64
}

/// Full SMA series; the first `window - 1` values are `NaN`.
pub fn rolling_mean(arr: &[f64], window: i64) -> Vec<f64> {
    let n = arr.len();
    let mut out = vec![f64::NAN; n];
    if !window_fits(window, n) {
        return out;
    }
    let w = window as usize;
    let prefix = prefix_sums(arr);
    for (i, slot) in out.iter_mut().enumerate().skip(w - 1) {
        *slot = sma_at(&prefix, i, w);
    }
    out
}
