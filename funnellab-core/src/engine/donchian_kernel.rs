//! Reference kernel: long-only Donchian channel breakout with an ATR stop.
//!
//! Rules, evaluated bar by bar with only information from bar `t-1`:
//!
//! - **Entry** (flat): a buy-stop at the previous channel high. The stop level
//!   is an opportunity only once both the channel and the ATR are defined;
//!   opportunities are thinned by the sparse trigger mask. Fills when the bar
//!   trades strictly above the level, at `max(open, level)` plus slippage.
//! - **Protective stop**: `entry_raw - stop_mult * atr[t-1]`, fixed at entry.
//!   Fills at `min(open, stop)` minus slippage when the bar's low reaches it.
//! - **Channel exit**: close below the previous channel low, filled at the close
//!   minus slippage.
//!
//! A position is never exited on its entry bar, and never re-entered on the
//! bar it was exited.

use crate::domain::{Fill, Side};
use crate::mask::mask_triggers;

use super::accounting::replay;
use super::kernel::{KernelInput, KernelObservability, KernelOutput, SimulationKernel};

#[derive(Debug, Clone, Copy, Default)]
pub struct DonchianAtrKernel;

impl DonchianAtrKernel {
    pub const NAME: &'static str = "donchian_atr_long";
}

struct OpenTrade {
    entry_bar: usize,
    stop: f64,
}

impl SimulationKernel for DonchianAtrKernel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn simulate(&self, input: &KernelInput<'_>) -> KernelOutput {
        let bars = input.bars;
        let n = bars.len();
        let ind = &input.indicators;
        let (open, high, low, close) = (bars.open(), bars.high(), bars.low(), bars.close());

        let mut triggers = vec![f64::NAN; n];
        for t in 1..n {
            if ind.donchian_upper[t - 1].is_finite() && ind.atr[t - 1].is_finite() {
                triggers[t] = ind.donchian_upper[t - 1];
            }
        }
        let warmup = input.params.channel_len.max(input.params.atr_len).max(0) as usize;
        let mask = mask_triggers(&triggers, input.trigger_rate, input.trigger_seed, warmup);

        let costs = input.costs;
        let fill = |bar_index: usize, side: Side, raw: f64| Fill {
            bar_index,
            side,
            price: costs.apply_slippage(raw, side),
            quantity: costs.order_qty,
            commission: costs.commission,
            forced: false,
        };

        let mut fills = Vec::new();
        let mut position: Option<OpenTrade> = None;

        for t in 0..n {
            if let Some(trade) = &position {
                if t > trade.entry_bar {
                    let exit_raw = if low[t] <= trade.stop {
                        Some(open[t].min(trade.stop))
                    } else if ind.donchian_lower[t - 1].is_finite()
                        && close[t] < ind.donchian_lower[t - 1]
                    {
                        Some(close[t])
                    } else {
                        None
                    };
                    if let Some(raw) = exit_raw {
                        fills.push(fill(t, Side::Sell, raw));
                        position = None;
                    }
                }
                continue;
            }

            let level = mask.intents[t];
            if level.is_finite() && high[t] > level {
                let raw = open[t].max(level);
                fills.push(fill(t, Side::Buy, raw));
                position = Some(OpenTrade {
                    entry_bar: t,
                    stop: raw - input.params.stop_mult * ind.atr[t - 1],
                });
            }
        }

        let ledger = replay(&fills, close);
        KernelOutput {
            metrics: ledger.metrics(),
            observability: Some(KernelObservability {
                intents_eligible: mask.eligible,
                intents_generated: mask.generated,
                entries: ledger.entries as u64,
                exits: ledger.exits as u64,
            }),
            equity: if input.return_debug {
                ledger.equity
            } else {
                Vec::new()
            },
            fills,
        }
    }
}
