//! Cost model: per-fill commission, per-unit slippage and order size.

use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Trading frictions applied by a kernel to every fill.
///
/// `commission` is a flat currency amount per fill, `slippage` a price
/// offset per unit applied against the trader, `order_qty` the units per entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub commission: f64,
    pub slippage: f64,
    pub order_qty: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

impl CostModel {
    pub fn new(commission: f64, slippage: f64, order_qty: f64) -> Self {
        Self {
            commission,
            slippage,
            order_qty,
        }
    }

    /// Zero costs, one unit per order.
    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Directional slippage: buyers pay more, sellers receive less.
    pub fn apply_slippage(&self, raw_price: f64, side: Side) -> f64 {
        raw_price + side.sign() * self.slippage
    }

    /// First offending field, if any.
    pub fn invalid_field(&self) -> Option<(&'static str, f64)> {
        if !(self.commission.is_finite() && self.commission >= 0.0) {
            return Some(("commission", self.commission));
        }
        if !(self.slippage.is_finite() && self.slippage >= 0.0) {
            return Some(("slippage", self.slippage));
        }
        if !(self.order_qty.is_finite() && self.order_qty > 0.0) {
            return Some(("order_qty", self.order_qty));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_is_adverse() {
        let c = CostModel::new(0.0, 0.25, 1.0);
        assert_eq!(c.apply_slippage(100.0, Side::Buy), 100.25);
        assert_eq!(c.apply_slippage(100.0, Side::Sell), 99.75);
    }

    #[test]
    fn validation_names_the_field() {
        assert!(CostModel::frictionless().invalid_field().is_none());
        assert_eq!(
            CostModel::new(-1.0, 0.0, 1.0).invalid_field(),
            Some(("commission", -1.0))
        );
        assert_eq!(
            CostModel::new(0.0, 0.0, 0.0).invalid_field(),
            Some(("order_qty", 0.0))
        );
        assert!(CostModel::new(0.0, f64::NAN, 1.0).invalid_field().is_some());
    }
}
