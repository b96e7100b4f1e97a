//! ParameterMatrix: the grid of strategy parameters a funnel stage sweeps.
//!
//! Row-major `(n_params × n_cols)` with at least three columns:
//! `channel_len`, `atr_len`, `stop_mult`. Extra columns ride along untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{OriginalIndex, Permutation};

/// Minimum column count: channel_len, atr_len, stop_mult.
pub const MIN_PARAM_COLS: usize = 3;

/// Malformed parameter matrix shapes. Always fatal, raised before any computation.
#[derive(Debug, Error, PartialEq)]
pub enum ParamShapeError {
    #[error("parameter matrix needs at least {MIN_PARAM_COLS} columns, got {0}")]
    TooFewColumns(usize),
    #[error("parameter data has {actual} values, expected {rows} x {cols} = {expected}")]
    DataLength {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Typed view of the three leading columns of one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRow {
    pub channel_len: i64,
    pub atr_len: i64,
    pub stop_mult: f64,
}

impl ParamRow {
    pub fn from_raw(row: &[f64]) -> Self {
        Self {
            channel_len: window_len(row[0]),
            atr_len: window_len(row[1]),
            stop_mult: row[2],
        }
    }

    /// True when both windows fit a series of `n_bars` and the stop multiple is usable.
    pub fn is_runnable(&self, n_bars: usize) -> bool {
        window_fits(self.channel_len, n_bars)
            && window_fits(self.atr_len, n_bars)
            && self.stop_mult.is_finite()
    }
}

/// Convert a matrix cell to an integer window length.
///
/// Non-finite cells become 0, which every consumer treats as degenerate.
pub fn window_len(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        0
    }
}

/// A window is usable when it is positive and no longer than the series.
pub fn window_fits(window: i64, n: usize) -> bool {
    window > 0 && (window as u64) <= n as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterMatrix")]
pub struct ParameterMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

/// Unvalidated wire form; deserialization goes through [`ParameterMatrix::new`].
#[derive(Deserialize)]
struct RawParameterMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl TryFrom<RawParameterMatrix> for ParameterMatrix {
    type Error = ParamShapeError;

    fn try_from(raw: RawParameterMatrix) -> Result<Self, Self::Error> {
        Self::new(raw.data, raw.rows, raw.cols)
    }
}

impl ParameterMatrix {
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, ParamShapeError> {
        if cols < MIN_PARAM_COLS {
            return Err(ParamShapeError::TooFewColumns(cols));
        }
        let expected = rows.checked_mul(cols).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(ParamShapeError::DataLength {
                rows,
                cols,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Build from nested rows. All rows must share one width.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ParamShapeError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(MIN_PARAM_COLS);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ParamShapeError::RaggedRow {
                    row: i,
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, rows.len(), cols)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn param_row(&self, i: usize) -> ParamRow {
        ParamRow::from_raw(self.row(i))
    }

    pub fn column(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |r| self.data[r * self.cols + c])
    }

    /// `self[order]`: a new matrix whose row `i` is `self.row(order[i])`.
    pub fn reorder(&self, order: &Permutation) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for &src in order.as_slice() {
            data.extend_from_slice(self.row(src));
        }
        Self {
            data,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Gather a subset of rows (in the given order) into a new matrix.
    pub fn select_rows(&self, ids: &[OriginalIndex]) -> Self {
        let mut data = Vec::with_capacity(ids.len() * self.cols);
        for id in ids {
            data.extend_from_slice(self.row(id.0));
        }
        Self {
            data,
            rows: ids.len(),
            cols: self.cols,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f64>()
    }
}
