//! BarSeries: columnar OHLC data shared by every stage of the funnel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a bar series.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("bar series is empty")]
    Empty,
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Immutable, time-ordered OHLC columns of equal length.
///
/// Stored column-wise so indicator kernels can run over contiguous slices.
/// Values are not sanity-checked beyond length: NaN bars simply propagate
/// through the indicators as undefined values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBarSeries")]
pub struct BarSeries {
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
}

/// Unvalidated wire form; deserialization goes through [`BarSeries::new`].
#[derive(Deserialize)]
struct RawBarSeries {
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
}

impl TryFrom<RawBarSeries> for BarSeries {
    type Error = DataError;

    fn try_from(raw: RawBarSeries) -> Result<Self, Self::Error> {
        Self::new(raw.open, raw.high, raw.low, raw.close)
    }
}

impl BarSeries {
    pub fn new(
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    ) -> Result<Self, DataError> {
        let expected = close.len();
        if expected == 0 {
            return Err(DataError::Empty);
        }
        for (column, len) in [
            ("open", open.len()),
            ("high", high.len()),
            ("low", low.len()),
        ] {
            if len != expected {
                return Err(DataError::LengthMismatch {
                    column,
                    expected,
                    actual: len,
                });
            }
        }
        Ok(Self {
            open,
            high,
            low,
            close,
        })
    }

    /// Synthesize plausible OHLC from closes.
    ///
    /// open = previous close (or close for the first bar),
    /// high = max(open, close) + spread, low = min(open, close) - spread.
    pub fn from_closes(closes: &[f64], spread: f64) -> Result<Self, DataError> {
        let n = closes.len();
        let mut open = Vec::with_capacity(n);
        let mut high = Vec::with_capacity(n);
        let mut low = Vec::with_capacity(n);
        for (i, &close) in closes.iter().enumerate() {
            let o = if i == 0 { close } else { closes[i - 1] };
            open.push(o);
            high.push(o.max(close) + spread);
            low.push(o.min(close) - spread);
        }
        Self::new(open, high, low, closes.to_vec())
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    /// Last close, used for forced exits at the right edge of the series.
    pub fn last_close(&self) -> f64 {
        self.close[self.close.len() - 1]
    }

    /// Content fingerprint: BLAKE3 over the little-endian bytes of all four columns.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.len() as u64).to_le_bytes());
        for column in [&self.open, &self.high, &self.low, &self.close] {
            for v in column.iter() {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Bytes held by the four columns.
    pub fn byte_size(&self) -> usize {
        self.len() * 4 * std::mem::size_of::<f64>()
    }
}
