//! Rolling extremes and the Donchian channel built from them.
//!
//! - Upper band: max(high[t-window+1..=t])
//! - Lower band: min(low[t-window+1..=t])
//!
//! The first `window - 1` outputs are `NaN`. Any `NaN` inside a window makes
//! that output `NaN`. Among equal values the latest one wins, in both the
//! deque fast path and the scan reference, so the two agree bit for bit.

use std::collections::VecDeque;

use crate::domain::window_fits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Max,
    Min,
}

impl Extreme {
    /// True when `candidate` should replace `incumbent`.
    #[inline]
    fn dominates(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Extreme::Max => candidate >= incumbent,
            Extreme::Min => candidate <= incumbent,
        }
    }
}

/// Rolling maximum over `window` bars (monotonic deque, O(n)).
pub fn rolling_max(arr: &[f64], window: i64) -> Vec<f64> {
    rolling_extreme(arr, window, Extreme::Max)
}

/// Rolling minimum over `window` bars (monotonic deque, O(n)).
pub fn rolling_min(arr: &[f64], window: i64) -> Vec<f64> {
    rolling_extreme(arr, window, Extreme::Min)
}

/// Reference rolling maximum: plain window scan, O(n * window).
pub fn rolling_max_scan(arr: &[f64], window: i64) -> Vec<f64> {
    rolling_extreme_scan(arr, window, Extreme::Max)
}

/// Reference rolling minimum: plain window scan, O(n * window).
pub fn rolling_min_scan(arr: &[f64], window: i64) -> Vec<f64> {
    rolling_extreme_scan(arr, window, Extreme::Min)
}

/// Donchian channel `(upper, lower)` for one channel length.
pub fn donchian(high: &[f64], low: &[f64], window: i64) -> (Vec<f64>, Vec<f64>) {
    (rolling_max(high, window), rolling_min(low, window))
}

fn rolling_extreme(arr: &[f64], window: i64, kind: Extreme) -> Vec<f64> {
    let n = arr.len();
    let mut out = vec![f64::NAN; n];
    if !window_fits(window, n) {
        return out;
    }
    let w = window as usize;

    let mut deque: VecDeque<usize> = VecDeque::with_capacity(w);
    let mut last_nan: Option<usize> = None;

    for i in 0..n {
        let v = arr[i];
        if v.is_nan() {
            last_nan = Some(i);
        } else {
            while let Some(&back) = deque.back() {
                if kind.dominates(v, arr[back]) {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(i);
        }

        if i + 1 < w {
            continue;
        }
        let start = i + 1 - w;
        while let Some(&front) = deque.front() {
            if front < start {
                deque.pop_front();
            } else {
                break;
            }
        }
        let nan_in_window = matches!(last_nan, Some(j) if j >= start);
        if !nan_in_window {
            if let Some(&front) = deque.front() {
                out[i] = arr[front];
            }
        }
    }
    out
}

fn rolling_extreme_scan(arr: &[f64], window: i64, kind: Extreme) -> Vec<f64> {
    let n = arr.len();
    let mut out = vec![f64::NAN; n];
    if !window_fits(window, n) {
        return out;
    }
    let w = window as usize;

    for i in (w - 1)..n {
        let slice = &arr[i + 1 - w..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mut best = slice[0];
        for &v in &slice[1..] {
            if kind.dominates(v, best) {
                best = v;
            }
        }
        out[i] = best;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn donchian_upper_3() {
        let high = [12.0, 15.0, 14.0, 16.0, 15.5];
        let result = rolling_max(&high, 3);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // [2] = max(12, 15, 14) = 15
        assert_approx(result[2], 15.0, DEFAULT_EPSILON);
        // [3] = max(15, 14, 16) = 16
        assert_approx(result[3], 16.0, DEFAULT_EPSILON);
        assert_approx(result[4], 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_lower_3() {
        let low = [9.0, 10.0, 13.0, 12.0, 14.0];
        let result = rolling_min(&low, 3);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 9.0, DEFAULT_EPSILON);
        assert_approx(result[3], 10.0, DEFAULT_EPSILON);
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn non_positive_or_oversized_window_is_all_undefined() {
        let arr = [1.0, 2.0, 3.0];
        for w in [0, -4, 4] {
            assert!(rolling_max(&arr, w).iter().all(|v| v.is_nan()));
            assert!(rolling_min(&arr, w).iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn window_one_is_identity() {
        let arr = [3.0, -1.0, 7.5, 2.0];
        assert_eq!(rolling_max(&arr, 1), arr.to_vec());
        assert_eq!(rolling_min(&arr, 1), arr.to_vec());
    }

    #[test]
    fn nan_poisons_only_windows_containing_it() {
        let arr = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let result = rolling_max(&arr, 2);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 4.0, DEFAULT_EPSILON);
        assert_approx(result[4], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn deque_matches_scan_bitwise() {
        let arr = [
            5.0, 3.0, 0.0, -0.0, 8.0, 8.0, f64::NAN, 2.0, 9.0, 1.0, 1.0, -0.0, 0.0, 4.0,
        ];
        for w in 1..=6 {
            let fast = rolling_max(&arr, w);
            let slow = rolling_max_scan(&arr, w);
            for (a, b) in fast.iter().zip(&slow) {
                assert_eq!(a.to_bits(), b.to_bits(), "max window {w}");
            }
            let fast = rolling_min(&arr, w);
            let slow = rolling_min_scan(&arr, w);
            for (a, b) in fast.iter().zip(&slow) {
                assert_eq!(a.to_bits(), b.to_bits(), "min window {w}");
            }
        }
    }

    #[test]
    fn donchian_pair_uses_high_and_low() {
        let high = [2.0, 4.0, 3.0];
        let low = [1.0, 0.5, 2.0];
        let (upper, lower) = donchian(&high, &low, 2);
        assert_eq!(upper[2], 4.0);
        assert_eq!(lower[2], 0.5);
    }
}
