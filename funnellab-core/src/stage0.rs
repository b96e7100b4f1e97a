//! Stage0 proxy scoring: a cheap, PnL-free ranking over the whole grid.
//!
//! Reads the first two parameter columns as `(fast_len, slow_len)` and scores
//! each row by the mean normalized separation of its two moving averages:
//!
//! ```text
//! score = mean_t |SMA_fast[t] - SMA_slow[t]| / close[t]
//! ```
//!
//! over the bars where both averages are defined. A NaN close only drops the
//! bars whose fast or slow window covers it. Higher means the pair sees
//! a more pronounced trend. Rows with unusable windows score `-inf` so they
//! always rank last.

use serde::{Deserialize, Serialize};

use crate::domain::{window_fits, window_len, OriginalIndex, ParamId, ParameterMatrix};
use crate::indicators::{prefix_sums, sma_at, PrefixSums};

/// Outcome of scoring one parameter row.
///
/// Carries no PnL-derived fields (profit, drawdown, trade count, Sharpe,
/// win rate, equity); Stage0 must stay cheap enough to run on the full grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stage0Result {
    pub param_id: ParamId,
    pub proxy_value: f64,
    pub warmup_ok: bool,
}

/// Score every row of `params` against `close`.
pub fn score_stage0(close: &[f64], params: &ParameterMatrix) -> Vec<Stage0Result> {
    let n = close.len();
    let prefix = prefix_sums(close);

    (0..params.n_rows())
        .map(|i| {
            let row = params.row(i);
            let fast = window_len(row[0]);
            let slow = window_len(row[1]);
            let warmup_ok = window_fits(fast, n) && window_fits(slow, n);
            let proxy_value = if warmup_ok {
                separation_score(close, &prefix, fast as usize, slow as usize)
            } else {
                f64::NEG_INFINITY
            };
            Stage0Result {
                param_id: OriginalIndex(i),
                proxy_value,
                warmup_ok,
            }
        })
        .collect()
}

fn separation_score(close: &[f64], prefix: &PrefixSums, fast: usize, slow: usize) -> f64 {
    let start = fast.max(slow) - 1;
    let mut sum = 0.0;
    let mut count = 0usize;
    for (i, &c) in close.iter().enumerate().skip(start) {
        if c == 0.0 || !c.is_finite() {
            continue;
        }
        let spread = (sma_at(prefix, i, fast) - sma_at(prefix, i, slow)).abs();
        if spread.is_nan() {
            continue;
        }
        sum += spread / c.abs();
        count += 1;
    }
    if count == 0 {
        return f64::NEG_INFINITY;
    }
    let score = sum / count as f64;
    if score.is_finite() {
        score
    } else {
        f64::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn zero_window_scores_negative_infinity() {
        let params =
            ParameterMatrix::from_rows(&[vec![0.0, 20.0, 1.0], vec![5.0, 20.0, 1.0]]).unwrap();
        let results = score_stage0(&trending(50), &params);
        assert_eq!(results[0].proxy_value, f64::NEG_INFINITY);
        assert!(!results[0].warmup_ok);
        assert!(results[1].proxy_value.is_finite());
        assert!(results[1].warmup_ok);
    }

    #[test]
    fn over_long_window_scores_negative_infinity() {
        let params = ParameterMatrix::from_rows(&[vec![5.0, 51.0, 1.0]]).unwrap();
        let results = score_stage0(&trending(50), &params);
        assert_eq!(results[0].proxy_value, f64::NEG_INFINITY);
    }

    #[test]
    fn wider_separation_scores_higher_on_a_trend() {
        let params = ParameterMatrix::from_rows(&[
            vec![5.0, 10.0, 1.0],
            vec![5.0, 30.0, 1.0],
            vec![10.0, 10.0, 1.0],
        ])
        .unwrap();
        let results = score_stage0(&trending(100), &params);
        assert!(results[1].proxy_value > results[0].proxy_value);
        // identical windows never separate
        assert_eq!(results[2].proxy_value, 0.0);
    }

    #[test]
    fn isolated_nan_close_keeps_scores_finite() {
        let mut close: Vec<f64> = (0..300)
            .map(|i| 100.0 + 0.1 * i as f64 + 5.0 * (i as f64 / 7.0).sin())
            .collect();
        close[10] = f64::NAN;
        let params =
            ParameterMatrix::from_rows(&[vec![5.0, 20.0, 2.0], vec![10.0, 50.0, 2.0]]).unwrap();
        let results = score_stage0(&close, &params);
        for r in &results {
            assert!(r.proxy_value.is_finite(), "row {} scored {}", r.param_id, r.proxy_value);
            assert!(r.proxy_value > 0.0);
        }
    }

    #[test]
    fn all_nan_closes_score_negative_infinity() {
        let close = vec![f64::NAN; 40];
        let params = ParameterMatrix::from_rows(&[vec![5.0, 20.0, 2.0]]).unwrap();
        assert_eq!(score_stage0(&close, &params)[0].proxy_value, f64::NEG_INFINITY);
    }

    #[test]
    fn param_ids_follow_row_order() {
        let params =
            ParameterMatrix::from_rows(&[vec![2.0, 3.0, 1.0], vec![3.0, 4.0, 1.0]]).unwrap();
        let results = score_stage0(&trending(10), &params);
        assert_eq!(results[0].param_id, OriginalIndex(0));
        assert_eq!(results[1].param_id, OriginalIndex(1));
    }

    #[test]
    fn result_serializes_without_pnl_fields() {
        let r = Stage0Result {
            param_id: OriginalIndex(3),
            proxy_value: 0.5,
            warmup_ok: true,
        };
        let value = serde_json::to_value(r).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["param_id", "proxy_value", "warmup_ok"]);
    }
}
