//! Indicator memoization for a grid run.
//!
//! Rows that share a `channel_len` share one Donchian pair; rows that share an
//! `atr_len` share one ATR series. The cache is built once before the row loop,
//! so indicator cost scales with the number of distinct lengths rather than
//! the number of parameter rows.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{window_fits, BarSeries, ParameterMatrix};

use super::atr::atr_wilder;
use super::donchian::donchian;
use super::IndicatorError;

/// Upper/lower Donchian bands for one channel length.
#[derive(Debug, Clone, PartialEq)]
pub struct DonchianPair {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Sizes reported for capacity planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub unique_channel_lens: usize,
    pub unique_atr_lens: usize,
    pub donchian_bytes: usize,
    pub atr_bytes: usize,
}

impl CacheStats {
    pub fn total_bytes(&self) -> usize {
        self.donchian_bytes + self.atr_bytes
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorCache {
    donchian: BTreeMap<i64, DonchianPair>,
    atr: BTreeMap<i64, Vec<f64>>,
}

impl IndicatorCache {
    /// Precompute every distinct, usable length present in the matrix.
    ///
    /// Lengths that are non-positive or longer than the series are skipped;
    /// rows using them are degenerate and never look the cache up.
    pub fn build(bars: &BarSeries, params: &ParameterMatrix) -> Result<Self, IndicatorError> {
        let n = bars.len();
        let channel_lens = distinct_windows(params, 0, n);
        let atr_lens = distinct_windows(params, 1, n);

        let mut cache = Self::default();
        for len in channel_lens {
            let (upper, lower) = donchian(bars.high(), bars.low(), len);
            cache.donchian.insert(len, DonchianPair { upper, lower });
        }
        for len in atr_lens {
            let series = atr_wilder(bars.high(), bars.low(), bars.close(), len)?;
            cache.atr.insert(len, series);
        }

        let stats = cache.stats();
        debug!(
            unique_channel_lens = stats.unique_channel_lens,
            unique_atr_lens = stats.unique_atr_lens,
            cache_bytes = stats.total_bytes(),
            "indicator cache built"
        );
        Ok(cache)
    }

    pub fn donchian(&self, channel_len: i64) -> Option<&DonchianPair> {
        self.donchian.get(&channel_len)
    }

    pub fn atr(&self, atr_len: i64) -> Option<&[f64]> {
        self.atr.get(&atr_len).map(Vec::as_slice)
    }

    pub fn stats(&self) -> CacheStats {
        let f = std::mem::size_of::<f64>();
        CacheStats {
            unique_channel_lens: self.donchian.len(),
            unique_atr_lens: self.atr.len(),
            donchian_bytes: self
                .donchian
                .values()
                .map(|p| (p.upper.len() + p.lower.len()) * f)
                .sum(),
            atr_bytes: self.atr.values().map(|s| s.len() * f).sum(),
        }
    }
}

fn distinct_windows(params: &ParameterMatrix, col: usize, n_bars: usize) -> BTreeSet<i64> {
    params
        .column(col)
        .map(crate::domain::window_len)
        .filter(|&w| window_fits(w, n_bars))
        .collect()
}
