//! Deterministic Top-K selection.
//!
//! Ordering is always `(score desc, param_id asc)`. The id tie-break is part
//! of the contract: selecting `K + 1` always extends the `K` selection.

use std::cmp::Ordering;

use crate::domain::{MetricsMatrix, OriginalIndex, ParamId};
use crate::stage0::Stage0Result;

/// Best `k` Stage0 rows by proxy value. `-inf` rows are never selected.
pub fn select_topk(results: &[Stage0Result], k: usize) -> Vec<ParamId> {
    let scored: Vec<(ParamId, f64)> = results
        .iter()
        .filter(|r| r.proxy_value != f64::NEG_INFINITY && !r.proxy_value.is_nan())
        .map(|r| (r.param_id, r.proxy_value))
        .collect();
    rank_by_score(scored, k)
}

/// Rank executed grid rows by net profit, best first.
///
/// Only rows in `executed` are candidates; unselected rows sit at the zero
/// vector and are not results. `k = None` keeps every executed row.
pub fn rank_grid_winners(
    metrics: &MetricsMatrix,
    executed: &[OriginalIndex],
    k: Option<usize>,
) -> Vec<ParamId> {
    let scored: Vec<(ParamId, f64)> = executed
        .iter()
        .map(|&id| (id, metrics.get(id).net_profit))
        .collect();
    let limit = k.unwrap_or(scored.len());
    rank_by_score(scored, limit)
}

fn rank_by_score(mut scored: Vec<(ParamId, f64)>, k: usize) -> Vec<ParamId> {
    if k == 0 {
        return Vec::new();
    }
    scored.sort_by(score_order);
    scored.into_iter().take(k).map(|(id, _)| id).collect()
}

fn score_order(a: &(ParamId, f64), b: &(ParamId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetricsRow;

    fn result(id: usize, v: f64) -> Stage0Result {
        Stage0Result {
            param_id: OriginalIndex(id),
            proxy_value: v,
            warmup_ok: v.is_finite(),
        }
    }

    #[test]
    fn orders_by_score_then_id() {
        let rs = vec![result(0, 1.0), result(1, 3.0), result(2, 3.0), result(3, 2.0)];
        let ids = select_topk(&rs, 3);
        assert_eq!(ids, vec![OriginalIndex(1), OriginalIndex(2), OriginalIndex(3)]);
    }

    #[test]
    fn k_zero_and_k_over_len() {
        let rs = vec![result(0, 1.0), result(1, 2.0)];
        assert!(select_topk(&rs, 0).is_empty());
        assert_eq!(select_topk(&rs, 10).len(), 2);
    }

    #[test]
    fn negative_infinity_is_never_selected() {
        let rs = vec![result(0, f64::NEG_INFINITY), result(1, -5.0)];
        assert_eq!(select_topk(&rs, 5), vec![OriginalIndex(1)]);
    }

    #[test]
    fn k_plus_one_extends_k() {
        let rs: Vec<_> = (0..20).map(|i| result(i, (i % 4) as f64)).collect();
        for k in 0..20 {
            let a = select_topk(&rs, k);
            let b = select_topk(&rs, k + 1);
            assert_eq!(&b[..a.len()], &a[..]);
        }
    }

    #[test]
    fn grid_winners_only_consider_executed_rows() {
        let mut m = MetricsMatrix::zeros(4);
        m.scatter(OriginalIndex(1), MetricsRow::sanitized(-5.0, 1, 5.0));
        m.scatter(OriginalIndex(3), MetricsRow::sanitized(12.0, 2, 1.0));
        let executed = [OriginalIndex(1), OriginalIndex(3)];
        let all = rank_grid_winners(&m, &executed, None);
        assert_eq!(all, vec![OriginalIndex(3), OriginalIndex(1)]);
        assert_eq!(rank_grid_winners(&m, &executed, Some(1)), vec![OriginalIndex(3)]);
        assert!(rank_grid_winners(&m, &[], Some(3)).is_empty());
    }
}
