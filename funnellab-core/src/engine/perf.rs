//! Typed observability record for a grid run.
//!
//! Built additively: one [`RowObservation`] per executed row plus run-level
//! timings. Nothing on the metrics path reads it, so disabling collection
//! never changes results.

use serde::{Deserialize, Serialize};

use crate::indicators::CacheStats;

use super::kernel::KernelObservability;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPerf {
    pub rows_total: usize,
    pub rows_selected: usize,
    pub rows_executed: usize,
    pub degenerate_rows: usize,
    pub cache: CacheStats,
    pub intents_eligible: u64,
    pub intents_generated: u64,
    pub fills: u64,
    pub entries: u64,
    pub exits: u64,
    pub forced_exits: u64,
    pub sort_secs: f64,
    pub indicator_secs: f64,
    pub loop_secs: f64,
    pub total_secs: f64,
}

/// What one executed row adds to the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowObservation {
    pub kernel: Option<KernelObservability>,
    pub fills: u64,
    pub forced_exits: u64,
}

impl GridPerf {
    pub fn record_row(&mut self, row: &RowObservation) {
        self.rows_executed += 1;
        self.fills += row.fills;
        self.forced_exits += row.forced_exits;
        if let Some(k) = row.kernel {
            self.intents_eligible += k.intents_eligible;
            self.intents_generated += k.intents_generated;
            self.entries += k.entries;
            self.exits += k.exits;
        }
    }

    /// Generated over eligible intents; 1.0 when nothing was eligible.
    pub fn trigger_keep_ratio(&self) -> f64 {
        if self.intents_eligible == 0 {
            1.0
        } else {
            self.intents_generated as f64 / self.intents_eligible as f64
        }
    }
}
