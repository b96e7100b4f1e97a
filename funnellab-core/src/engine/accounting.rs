//! Fill replay: turns a chronological fill list into round trips, a
//! mark-to-market equity curve and the three grid metrics.
//!
//! Positions are single-lot: a fill while flat opens a position in the fill's
//! direction, the next opposite fill closes it. Profit figures are in currency,
//! not fractions, and drawdown is reported as a non-negative magnitude.

use crate::domain::{Fill, Side};

use super::kernel::KernelMetrics;

/// A completed entry/exit pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTrip {
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenLot {
    bar: usize,
    side: Side,
    price: f64,
    quantity: f64,
    commission: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub round_trips: Vec<RoundTrip>,
    pub equity: Vec<f64>,
    pub entries: usize,
    pub exits: usize,
    /// Side and quantity of a position still open at the series end.
    pub open_position: Option<(Side, f64)>,
}

impl Ledger {
    pub fn net_profit(&self) -> f64 {
        self.round_trips.iter().map(|t| t.pnl).sum()
    }

    pub fn metrics(&self) -> KernelMetrics {
        KernelMetrics {
            net_profit: self.net_profit(),
            trades: self.round_trips.len() as u64,
            max_dd: max_drawdown(&self.equity),
        }
    }
}

/// Replay `fills` (sorted by bar) against `close`, marking open positions to market.
pub fn replay(fills: &[Fill], close: &[f64]) -> Ledger {
    let n = close.len();
    let mut ledger = Ledger {
        equity: Vec::with_capacity(n),
        ..Ledger::default()
    };

    let mut realized = 0.0;
    let mut open: Option<OpenLot> = None;
    let mut next_fill = 0;

    for (t, &c) in close.iter().enumerate() {
        while next_fill < fills.len() && fills[next_fill].bar_index <= t {
            let fill = fills[next_fill];
            next_fill += 1;
            match open {
                Some(lot) if lot.side != fill.side => {
                    let gross = (fill.price - lot.price) * lot.quantity * lot.side.sign();
                    let pnl = gross - lot.commission - fill.commission;
                    // entry commission was already booked when the lot opened
                    realized += gross - fill.commission;
                    ledger.round_trips.push(RoundTrip {
                        entry_bar: lot.bar,
                        exit_bar: fill.bar_index,
                        side: lot.side,
                        entry_price: lot.price,
                        exit_price: fill.price,
                        quantity: lot.quantity,
                        pnl,
                    });
                    ledger.exits += 1;
                    open = None;
                }
                Some(_) => {
                    // pyramiding is not modelled; same-side fills while open are ignored
                }
                None => {
                    realized -= fill.commission;
                    open = Some(OpenLot {
                        bar: fill.bar_index,
                        side: fill.side,
                        price: fill.price,
                        quantity: fill.quantity,
                        commission: fill.commission,
                    });
                    ledger.entries += 1;
                }
            }
        }

        let unrealized = match open {
            Some(lot) if c.is_finite() => (c - lot.price) * lot.quantity * lot.side.sign(),
            _ => 0.0,
        };
        ledger.equity.push(realized + unrealized);
    }

    ledger.open_position = open.map(|lot| (lot.side, lot.quantity));
    ledger
}

/// Largest peak-to-trough fall of an equity curve that starts from zero.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if !eq.is_finite() {
            continue;
        }
        if eq > peak {
            peak = eq;
        }
        let dd = peak - eq;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(bar: usize, side: Side, price: f64) -> Fill {
        Fill {
            bar_index: bar,
            side,
            price,
            quantity: 1.0,
            commission: 0.0,
            forced: false,
        }
    }

    #[test]
    fn long_round_trip() {
        let fills = [fill(1, Side::Buy, 10.0), fill(3, Side::Sell, 13.0)];
        let ledger = replay(&fills, &[10.0, 10.0, 12.0, 13.0, 13.0]);
        assert_eq!(ledger.round_trips.len(), 1);
        assert_eq!(ledger.net_profit(), 3.0);
        assert_eq!(ledger.equity, vec![0.0, 0.0, 2.0, 3.0, 3.0]);
        assert_eq!(ledger.entries, 1);
        assert_eq!(ledger.exits, 1);
        assert!(ledger.open_position.is_none());
    }

    #[test]
    fn commissions_reduce_profit_on_both_legs() {
        let mut entry = fill(0, Side::Buy, 10.0);
        entry.commission = 0.5;
        let mut exit = fill(1, Side::Sell, 12.0);
        exit.commission = 0.5;
        let ledger = replay(&[entry, exit], &[10.0, 12.0]);
        assert_eq!(ledger.net_profit(), 1.0);
        assert_eq!(*ledger.equity.last().unwrap(), 1.0);
    }

    #[test]
    fn open_position_is_marked_but_not_counted() {
        let ledger = replay(&[fill(0, Side::Buy, 10.0)], &[10.0, 8.0, 9.0]);
        assert_eq!(ledger.round_trips.len(), 0);
        assert_eq!(ledger.net_profit(), 0.0);
        assert_eq!(ledger.equity, vec![0.0, -2.0, -1.0]);
        assert_eq!(ledger.metrics().max_dd, 2.0);
        assert_eq!(ledger.open_position, Some((Side::Buy, 1.0)));
    }

    #[test]
    fn short_round_trip() {
        let fills = [fill(0, Side::Sell, 10.0), fill(1, Side::Buy, 7.0)];
        let ledger = replay(&fills, &[10.0, 7.0]);
        assert_eq!(ledger.net_profit(), 3.0);
    }

    #[test]
    fn max_drawdown_known() {
        assert_eq!(max_drawdown(&[0.0, 5.0, 2.0, 6.0, 1.0, 4.0]), 5.0);
        assert_eq!(max_drawdown(&[0.0, 1.0, 2.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[-3.0]), 3.0);
    }
}
