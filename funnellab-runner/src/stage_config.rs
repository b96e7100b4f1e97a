//! Per-stage configuration: the funnel config merged with one stage's plan
//! entry and the winners handed over by the previous stage.

use serde::{Deserialize, Serialize};

use funnellab_core::domain::OriginalIndex;
use funnellab_core::engine::ExecutionOptions;
use funnellab_core::rng::SeedHierarchy;

use crate::config::{CostConfig, ExecutionConfig, FunnelConfig};
use crate::plan::{StageName, StageSpec};

/// Scope label for per-stage subsample seeds.
pub const SUBSAMPLE_SCOPE: &str = "stage_subsample";

#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub stage: StageName,
    pub param_subsample_rate: f64,
    pub subsample_seed: u64,
    pub topk: Option<usize>,
    /// Rows the stage is handed, before subsampling.
    pub param_count: usize,
    pub bar_count: usize,
    pub costs: CostConfig,
    pub execution: ExecutionConfig,
    /// Original-matrix ids forwarded by the previous stage; `None` means the
    /// full grid.
    pub prev_stage_winners: Option<Vec<OriginalIndex>>,
}

impl StageConfig {
    pub fn merge(
        base: &FunnelConfig,
        spec: &StageSpec,
        bar_count: usize,
        param_count: usize,
        prev_stage_winners: Option<Vec<OriginalIndex>>,
    ) -> Self {
        let seeds = SeedHierarchy::new(base.subsample_seed);
        Self {
            stage: spec.name,
            param_subsample_rate: spec.param_subsample_rate,
            subsample_seed: seeds.sub_seed(SUBSAMPLE_SCOPE, spec.name.index() as u64),
            topk: spec.topk,
            param_count,
            bar_count,
            costs: base.costs,
            execution: base.execution,
            prev_stage_winners,
        }
    }

    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            sort_params: self.execution.sort_params,
            force_close_last: self.execution.force_close_last,
            return_debug: false,
            collect_perf: self.execution.collect_perf,
            subsample_rate: self.param_subsample_rate,
            subsample_seed: self.subsample_seed,
            trigger_rate: self.execution.trigger_rate,
            trigger_seed: self.execution.trigger_seed,
        }
    }

    /// Array-free view for hashing and `config_snapshot.json`.
    pub fn snapshot(&self) -> ConfigSnapshot {
        let (prev_winners_count, prev_winners_digest) = match &self.prev_stage_winners {
            Some(ids) => (Some(ids.len()), Some(winners_digest(ids))),
            None => (None, None),
        };
        ConfigSnapshot {
            stage: self.stage,
            param_subsample_rate: self.param_subsample_rate,
            subsample_seed: self.subsample_seed,
            topk: self.topk,
            param_count: self.param_count,
            bar_count: self.bar_count,
            costs: self.costs,
            execution: self.execution,
            prev_winners_count,
            prev_winners_digest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub stage: StageName,
    pub param_subsample_rate: f64,
    pub subsample_seed: u64,
    pub topk: Option<usize>,
    pub param_count: usize,
    pub bar_count: usize,
    pub costs: CostConfig,
    pub execution: ExecutionConfig,
    pub prev_winners_count: Option<usize>,
    pub prev_winners_digest: Option<String>,
}

/// BLAKE3 over the little-endian winner ids, in forwarding order.
pub fn winners_digest(ids: &[OriginalIndex]) -> String {
    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(&(id.0 as u64).to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
