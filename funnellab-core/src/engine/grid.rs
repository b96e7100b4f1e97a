//! Grid execution: run the kernel over the selected rows of a parameter
//! matrix and scatter results back into original row order.
//!
//! Pipeline per call:
//!
//! 1. Validate costs and rates.
//! 2. Optionally sort rows for indicator locality.
//! 3. Build the indicator cache for every distinct usable length.
//! 4. Subsample sorted positions.
//! 5. For each selected position, ascending: look up indicators, call the
//!    kernel, optionally force-close an open position at the last close,
//!    sanitize, and write the row to its original index.
//!
//! Degenerate rows are skipped and left at zero. They never fail the run.

use std::borrow::Cow;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::domain::{
    BarSeries, Fill, MetricsMatrix, MetricsRow, OriginalIndex, ParameterMatrix, Permutation,
    SortedPos,
};
use crate::indicators::{IndicatorCache, IndicatorError};
use crate::rng::{SeedHierarchy, TRIGGER_SCOPE};
use crate::sort::sort_params_cache_friendly;
use crate::subsample::{subsample_indices, SubsampleError};

use super::accounting::replay;
use super::cost::CostModel;
use super::kernel::{
    KernelInput, KernelMetrics, KernelOutput, PrecomputedIndicators, SimulationKernel,
};
use super::options::ExecutionOptions;
use super::perf::{GridPerf, RowObservation};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid cost model: {field} = {value}")]
    InvalidCost { field: &'static str, value: f64 },
    #[error("trigger rate must be within [0, 1], got {0}")]
    InvalidTriggerRate(f64),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Subsample(#[from] SubsampleError),
}

/// Fills and equity for one executed row, kept only with `return_debug`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDebug {
    pub param_id: OriginalIndex,
    pub sorted_pos: SortedPos,
    pub fills: Vec<Fill>,
    pub equity: Vec<f64>,
    pub forced_exit: bool,
}

#[derive(Debug, Clone)]
pub struct GridResult {
    /// One row per input row, in the caller's order.
    pub metrics: MetricsMatrix,
    /// Sort permutation applied; identity when sorting was disabled.
    pub order: Permutation,
    /// Positions chosen by the subsampler, ascending.
    pub selected: Vec<SortedPos>,
    /// Rows actually simulated, in execution order.
    pub executed: Vec<OriginalIndex>,
    pub perf: Option<GridPerf>,
    pub debug: Vec<RowDebug>,
}

/// Run `kernel` over `params` against `bars`.
pub fn run_grid(
    bars: &BarSeries,
    params: &ParameterMatrix,
    costs: &CostModel,
    kernel: &dyn SimulationKernel,
    opts: ExecutionOptions,
) -> Result<GridResult, EngineError> {
    if let Some((field, value)) = costs.invalid_field() {
        return Err(EngineError::InvalidCost { field, value });
    }
    if !(0.0..=1.0).contains(&opts.trigger_rate) {
        return Err(EngineError::InvalidTriggerRate(opts.trigger_rate));
    }

    let started = Instant::now();
    let n_rows = params.n_rows();
    let n_bars = bars.len();

    let (sorted, order): (Cow<'_, ParameterMatrix>, Permutation) = if opts.sort_params {
        let (m, p) = sort_params_cache_friendly(params);
        (Cow::Owned(m), p)
    } else {
        (Cow::Borrowed(params), Permutation::identity(n_rows))
    };
    let sort_secs = started.elapsed().as_secs_f64();

    let indicator_start = Instant::now();
    let cache = IndicatorCache::build(bars, &sorted)?;
    let indicator_secs = indicator_start.elapsed().as_secs_f64();

    let selected: Vec<SortedPos> =
        subsample_indices(n_rows, opts.subsample_rate, opts.subsample_seed)?
            .into_iter()
            .map(SortedPos)
            .collect();

    let seeds = SeedHierarchy::new(opts.trigger_seed);
    let mut metrics = MetricsMatrix::zeros(n_rows);
    let mut executed = Vec::with_capacity(selected.len());
    let mut debug_rows = Vec::new();
    let mut perf = GridPerf {
        rows_total: n_rows,
        rows_selected: selected.len(),
        cache: cache.stats(),
        ..GridPerf::default()
    };

    let loop_start = Instant::now();
    for &pos in &selected {
        let original = order.to_original(pos);
        let row = sorted.param_row(pos.0);

        let lookups = if row.is_runnable(n_bars) {
            cache.donchian(row.channel_len).zip(cache.atr(row.atr_len))
        } else {
            None
        };
        let Some((channel, atr)) = lookups else {
            debug!(param_id = original.0, ?row, "degenerate parameter row skipped");
            perf.degenerate_rows += 1;
            continue;
        };

        let input = KernelInput {
            bars,
            params: row,
            costs,
            indicators: PrecomputedIndicators {
                donchian_upper: &channel.upper,
                donchian_lower: &channel.lower,
                atr,
            },
            trigger_rate: opts.trigger_rate,
            trigger_seed: seeds.sub_seed(TRIGGER_SCOPE, original.0 as u64),
            return_debug: opts.return_debug,
        };
        let mut out = kernel.simulate(&input);

        let forced = opts.force_close_last && force_close(&mut out, bars, costs, opts.return_debug);

        let KernelMetrics {
            net_profit,
            trades,
            max_dd,
        } = out.metrics;
        let result = MetricsRow::sanitized(net_profit, trades, max_dd);
        // A row with fills but no completed trade can legitimately score [0, 0, 0]
        // (an open position marked flat). Once positions are force-closed, any
        // fill implies a completed trade and therefore a non-zero row.
        debug_assert!(
            trades == 0 || !result.is_zero(),
            "row {original} completed trades but scattered a zero row"
        );
        debug_assert!(
            !opts.force_close_last || out.fills.is_empty() || !result.is_zero(),
            "row {original} filled under force-close but scattered a zero row"
        );

        // the only write into the result table
        let written = metrics.scatter(original, result);
        debug_assert!(written, "row {original} selected twice");
        executed.push(original);

        if opts.collect_perf {
            perf.record_row(&RowObservation {
                kernel: out.observability,
                fills: out.fills.len() as u64,
                forced_exits: u64::from(forced),
            });
        }
        if opts.return_debug {
            debug_rows.push(RowDebug {
                param_id: original,
                sorted_pos: pos,
                fills: out.fills,
                equity: out.equity,
                forced_exit: forced,
            });
        }
    }

    perf.loop_secs = loop_start.elapsed().as_secs_f64();
    perf.sort_secs = sort_secs;
    perf.indicator_secs = indicator_secs;
    perf.total_secs = started.elapsed().as_secs_f64();

    debug!(
        rows_total = n_rows,
        rows_selected = selected.len(),
        rows_executed = executed.len(),
        degenerate_rows = perf.degenerate_rows,
        "grid run finished"
    );

    Ok(GridResult {
        metrics,
        order,
        selected,
        executed,
        perf: opts.collect_perf.then_some(perf),
        debug: debug_rows,
    })
}

/// Close a position left open at the last bar and recompute the metrics.
///
/// Returns whether a forced fill was added.
fn force_close(
    out: &mut KernelOutput,
    bars: &BarSeries,
    costs: &CostModel,
    keep_equity: bool,
) -> bool {
    let ledger = replay(&out.fills, bars.close());
    if ledger.entries <= ledger.exits {
        return false;
    }
    let Some((side, quantity)) = ledger.open_position else {
        return false;
    };

    out.fills.push(Fill {
        bar_index: bars.len() - 1,
        side: side.opposite(),
        price: bars.last_close(),
        quantity,
        commission: costs.commission,
        forced: true,
    });
    let closed = replay(&out.fills, bars.close());
    out.metrics = closed.metrics();
    if let Some(obs) = out.observability.as_mut() {
        obs.exits += 1;
    }
    if keep_equity {
        out.equity = closed.equity;
    }
    true
}
