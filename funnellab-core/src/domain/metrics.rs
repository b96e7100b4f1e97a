//! MetricsMatrix: full-size, original-order result table for a grid run.

use serde::{Deserialize, Serialize};

use super::ids::OriginalIndex;

/// One row of grid output: `[net_profit, trades, max_drawdown]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsRow {
    pub net_profit: f64,
    pub trades: u64,
    pub max_drawdown: f64,
}

impl MetricsRow {
    pub const ZERO: MetricsRow = MetricsRow {
        net_profit: 0.0,
        trades: 0,
        max_drawdown: 0.0,
    };

    /// Build a row, coercing non-finite profit/drawdown to 0.0.
    pub fn sanitized(net_profit: f64, trades: u64, max_drawdown: f64) -> Self {
        Self {
            net_profit: finite_or_zero(net_profit),
            trades,
            max_drawdown: finite_or_zero(max_drawdown),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.net_profit, self.trades as f64, self.max_drawdown]
    }
}

pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// `(n_params × 3)` metrics in the caller's row order.
///
/// Allocated as all zeros; each row may be written once via [`MetricsMatrix::scatter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsMatrix {
    rows: Vec<MetricsRow>,
    #[serde(skip)]
    written: Vec<bool>,
}

impl MetricsMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            rows: vec![MetricsRow::ZERO; n],
            written: vec![false; n],
        }
    }

    /// Write a row into its original slot. Returns `false` (and leaves the
    /// existing value) if the slot was already written.
    pub(crate) fn scatter(&mut self, index: OriginalIndex, row: MetricsRow) -> bool {
        if self.written[index.0] {
            return false;
        }
        self.written[index.0] = true;
        self.rows[index.0] = row;
        true
    }

    pub fn get(&self, index: OriginalIndex) -> &MetricsRow {
        &self.rows[index.0]
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows written by the engine (selected and runnable).
    pub fn written_count(&self) -> usize {
        self.written.iter().filter(|w| **w).count()
    }

    pub fn was_written(&self, index: OriginalIndex) -> bool {
        self.written.get(index.0).copied().unwrap_or(false)
    }

    pub fn total_trades(&self) -> u64 {
        self.rows.iter().map(|r| r.trades).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_are_exact_zero_rows() {
        let m = MetricsMatrix::zeros(3);
        assert!(m.rows().iter().all(MetricsRow::is_zero));
        assert_eq!(m.written_count(), 0);
    }

    #[test]
    fn scatter_is_write_once() {
        let mut m = MetricsMatrix::zeros(2);
        let row = MetricsRow::sanitized(10.0, 2, 3.0);
        assert!(m.scatter(OriginalIndex(1), row));
        assert!(!m.scatter(OriginalIndex(1), MetricsRow::sanitized(99.0, 9, 9.0)));
        assert_eq!(*m.get(OriginalIndex(1)), row);
        assert!(m.get(OriginalIndex(0)).is_zero());
        assert_eq!(m.written_count(), 1);
        assert!(m.was_written(OriginalIndex(1)));
    }

    #[test]
    fn sanitized_coerces_non_finite() {
        let row = MetricsRow::sanitized(f64::NAN, 4, f64::INFINITY);
        assert_eq!(row.net_profit, 0.0);
        assert_eq!(row.max_drawdown, 0.0);
        assert_eq!(row.trades, 4);
        assert_eq!(row.as_array(), [0.0, 4.0, 0.0]);
    }
}
