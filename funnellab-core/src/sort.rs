//! Cache-friendly ordering of a parameter matrix.
//!
//! Rows are sorted by `(channel_len, atr_len, stop_mult)` ascending so that
//! consecutive rows hit the same memoized indicator series.

use std::cmp::Ordering;

use crate::domain::{ParameterMatrix, Permutation};

/// Sort the matrix for indicator locality. Returns `(sorted, order)` with
/// `sorted = matrix[order]`. The sort is stable, so tied rows keep their
/// original relative order.
pub fn sort_params_cache_friendly(matrix: &ParameterMatrix) -> (ParameterMatrix, Permutation) {
    let mut order: Vec<usize> = (0..matrix.n_rows()).collect();
    order.sort_by(|&a, &b| cache_key_cmp(matrix.row(a), matrix.row(b)));
    let perm = Permutation::from_sorted_indices(order);
    (matrix.reorder(&perm), perm)
}

fn cache_key_cmp(a: &[f64], b: &[f64]) -> Ordering {
    a[0].total_cmp(&b[0])
        .then_with(|| a[1].total_cmp(&b[1]))
        .then_with(|| a[2].total_cmp(&b[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OriginalIndex, SortedPos};

    #[test]
    fn sorts_by_channel_then_atr_then_stop() {
        let m = ParameterMatrix::from_rows(&[
            vec![20.0, 14.0, 2.0],
            vec![10.0, 20.0, 1.0],
            vec![10.0, 14.0, 3.0],
            vec![10.0, 14.0, 1.5],
        ])
        .unwrap();
        let (sorted, order) = sort_params_cache_friendly(&m);
        assert_eq!(order.as_slice(), &[3, 2, 1, 0]);
        assert_eq!(sorted.row(0), &[10.0, 14.0, 1.5]);
        assert_eq!(sorted.row(3), &[20.0, 14.0, 2.0]);
        assert_eq!(order.to_original(SortedPos(0)), OriginalIndex(3));
    }

    #[test]
    fn ties_keep_original_order() {
        let m = ParameterMatrix::from_rows(&[
            vec![5.0, 5.0, 1.0, 100.0],
            vec![5.0, 5.0, 1.0, 200.0],
            vec![1.0, 1.0, 1.0, 300.0],
        ])
        .unwrap();
        let (sorted, order) = sort_params_cache_friendly(&m);
        assert_eq!(order.as_slice(), &[2, 0, 1]);
        assert_eq!(sorted.row(1)[3], 100.0);
        assert_eq!(sorted.row(2)[3], 200.0);
    }

    #[test]
    fn round_trip_matches_reorder() {
        let m = ParameterMatrix::from_rows(&[
            vec![3.0, 1.0, 1.0],
            vec![1.0, 2.0, 1.0],
            vec![2.0, 3.0, 1.0],
        ])
        .unwrap();
        let (sorted, order) = sort_params_cache_friendly(&m);
        for i in 0..m.n_rows() {
            let orig = order.to_original(SortedPos(i));
            assert_eq!(sorted.row(i), m.row(orig.0));
        }
    }
}
