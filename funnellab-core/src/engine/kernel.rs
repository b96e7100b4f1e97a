//! Simulation kernel contract.
//!
//! The grid engine treats the per-row simulation as a black box behind
//! [`SimulationKernel`]. A kernel receives the bars, one typed parameter row,
//! the cost model and slices into the engine's indicator cache, and returns
//! metrics plus its fills. Kernels must be deterministic: identical inputs
//! produce bit-identical outputs.

use crate::domain::{BarSeries, Fill, ParamRow};

use super::cost::CostModel;

/// Indicator slices for one row, borrowed from the engine's cache.
#[derive(Debug, Clone, Copy)]
pub struct PrecomputedIndicators<'a> {
    pub donchian_upper: &'a [f64],
    pub donchian_lower: &'a [f64],
    pub atr: &'a [f64],
}

#[derive(Debug, Clone, Copy)]
pub struct KernelInput<'a> {
    pub bars: &'a BarSeries,
    pub params: ParamRow,
    pub costs: &'a CostModel,
    pub indicators: PrecomputedIndicators<'a>,
    /// Fraction of entry opportunities to keep, in `[0, 1]`.
    pub trigger_rate: f64,
    /// Seed for this row's trigger mask.
    pub trigger_seed: u64,
    pub return_debug: bool,
}

/// The three numbers every row contributes to the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KernelMetrics {
    pub net_profit: f64,
    pub trades: u64,
    pub max_dd: f64,
}

/// Per-row counters; auxiliary, never read by the metrics path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelObservability {
    pub intents_eligible: u64,
    pub intents_generated: u64,
    pub entries: u64,
    pub exits: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelOutput {
    pub metrics: KernelMetrics,
    /// Chronological fills.
    pub fills: Vec<Fill>,
    /// Per-bar equity; empty unless `return_debug` was set.
    pub equity: Vec<f64>,
    pub observability: Option<KernelObservability>,
}

pub trait SimulationKernel: Send + Sync {
    /// Stable identifier recorded in run manifests.
    fn name(&self) -> &str;

    fn simulate(&self, input: &KernelInput<'_>) -> KernelOutput;
}
