//! Behaviour switches for one grid run, passed by value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Sort rows for indicator-cache locality before the row loop.
    pub sort_params: bool,
    /// Close positions still open at the last bar and count them as trades.
    pub force_close_last: bool,
    /// Keep per-row fills and equity in [`super::GridResult::debug`].
    pub return_debug: bool,
    /// Assemble a [`super::GridPerf`] record.
    pub collect_perf: bool,
    pub subsample_rate: f64,
    pub subsample_seed: u64,
    pub trigger_rate: f64,
    /// Master seed; each row derives its own mask seed from it.
    pub trigger_seed: u64,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            sort_params: true,
            force_close_last: false,
            return_debug: false,
            collect_perf: true,
            subsample_rate: 1.0,
            subsample_seed: 0,
            trigger_rate: 1.0,
            trigger_seed: 0,
        }
    }
}

impl ExecutionOptions {
    pub fn with_subsample(mut self, rate: f64, seed: u64) -> Self {
        self.subsample_rate = rate;
        self.subsample_seed = seed;
        self
    }

    pub fn with_triggers(mut self, rate: f64, seed: u64) -> Self {
        self.trigger_rate = rate;
        self.trigger_seed = seed;
        self
    }
}
