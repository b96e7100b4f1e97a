//! Index spaces for parameter rows.
//!
//! The engine works in two spaces at once: the caller's row order
//! (`OriginalIndex`, also used as the public `param_id`) and the row order of
//! the cache-sorted matrix (`SortedPos`). Keeping them as distinct newtypes
//! means the only way across is `Permutation::to_original`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row index in the caller's parameter matrix. Doubles as the param id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginalIndex(pub usize);

/// Row position inside the sorted parameter matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortedPos(pub usize);

/// Public identifier of a parameter row.
pub type ParamId = OriginalIndex;

impl fmt::Display for OriginalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SortedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The row permutation applied to a parameter matrix: `sorted[i] = original[order[i]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permutation {
    order: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            order: (0..n).collect(),
        }
    }

    /// Wrap an order vector. Returns `None` unless it is a permutation of `0..len`.
    pub fn from_order(order: Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; order.len()];
        for &i in &order {
            if i >= order.len() || seen[i] {
                return None;
            }
            seen[i] = true;
        }
        Some(Self { order })
    }

    /// Wrap an order produced by sorting `0..n`; always a valid permutation.
    pub(crate) fn from_sorted_indices(order: Vec<usize>) -> Self {
        debug_assert!(Self::from_order(order.clone()).is_some());
        Self { order }
    }

    /// Map a sorted position back to the caller's row index.
    pub fn to_original(&self, pos: SortedPos) -> OriginalIndex {
        OriginalIndex(self.order[pos.0])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(i, &o)| i == o)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }
}
