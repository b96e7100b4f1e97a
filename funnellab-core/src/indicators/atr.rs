//! Average True Range with Wilder smoothing.
//!
//! True Range: TR[0] = high[0] - low[0];
//! TR[t] = max(high-low, |high-close[t-1]|, |low-close[t-1]|).
//! ATR[window-1] = mean(TR[0..window]); afterwards
//! ATR[t] = (ATR[t-1] * (window-1) + TR[t]) / window.

use crate::domain::window_fits;

use super::IndicatorError;

/// Compute the True Range series.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Result<Vec<f64>, IndicatorError> {
    check_lengths(high, low, close)?;
    let n = close.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return Ok(tr);
    }

    tr[0] = high[0] - low[0];
    for i in 1..n {
        let h = high[i];
        let l = low[i];
        let pc = close[i - 1];
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    Ok(tr)
}

/// Wilder ATR. `window <= 0` or `window > n` yields an all-`NaN` series.
pub fn atr_wilder(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    window: i64,
) -> Result<Vec<f64>, IndicatorError> {
    let tr = true_range(high, low, close)?;
    let n = tr.len();
    let mut atr = vec![f64::NAN; n];
    if !window_fits(window, n) {
        return Ok(atr);
    }
    let w = window as usize;
    let wf = w as f64;

    let seed = tr[..w].iter().sum::<f64>() / wf;
    atr[w - 1] = seed;
    let mut prev = seed;
    for i in w..n {
        let next = (prev * (wf - 1.0) + tr[i]) / wf;
        atr[i] = next;
        prev = next;
    }
    Ok(atr)
}

fn check_lengths(high: &[f64], low: &[f64], close: &[f64]) -> Result<(), IndicatorError> {
    let n = close.len();
    if high.len() != n || low.len() != n {
        return Err(IndicatorError::LengthMismatch {
            high: high.len(),
            low: low.len(),
            close: n,
        });
    }
    Ok(())
}
