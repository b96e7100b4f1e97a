//! Funnel runner: executes the three planned stages in order.
//!
//! Per stage:
//! 1. merge the funnel config with the stage's plan entry and the winners
//!    forwarded by the previous stage
//! 2. ask the OOM gate; adopt its replacement config, or stop on BLOCK
//! 3. hash the config snapshot and mint a run id
//! 4. execute: Stage0 scores a subsample of the full grid with the proxy,
//!    Stage1 and Stage2 run the grid engine over the forwarded rows
//! 5. persist the run artifacts and forward the winners
//!
//! Winners always travel as original-matrix ids. Forwarded ids are sorted
//! ascending before the next stage builds its submatrix, so local row order
//! agrees with global id order and ranking ties resolve on the global id.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

use funnellab_core::domain::{BarSeries, OriginalIndex, ParameterMatrix};
use funnellab_core::engine::{run_grid, EngineError, SimulationKernel};
use funnellab_core::stage0::{score_stage0, Stage0Result};
use funnellab_core::subsample::subsample_indices;
use funnellab_core::topk::{rank_grid_winners, select_topk};

use crate::artifacts::{
    write_run_artifacts, ArtifactError, GateRecord, GitInfo, RunArtifacts, RunManifest,
    StageMetrics, StageSummary, WinnerEntry, Winners, WinnersNotes, SCHEMA_VERSION,
    WINNERS_SCHEMA,
};
use crate::config::{ConfigError, EmptyWinnersPolicy, FunnelConfig};
use crate::fingerprint::{config_hash, mint_run_id};
use crate::oom_gate::{decide, GateError, OomGateAction};
use crate::plan::{build_plan_from_config, FunnelPlan, PlanError, StageName, StageSpec};
use crate::stage_config::StageConfig;

#[derive(Debug, Error)]
pub enum FunnelError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("{stage} blocked by OOM gate: {reason}")]
    Blocked { stage: StageName, reason: String },
    #[error("{stage}: {source}")]
    Gate {
        stage: StageName,
        #[source]
        source: GateError,
    },
    #[error("{stage}: {source}")]
    Engine {
        stage: StageName,
        #[source]
        source: EngineError,
    },
    #[error("{stage}: previous stage forwarded no winners")]
    EmptyWinners { stage: StageName },
    #[error("{stage}: {source}")]
    Artifacts {
        stage: StageName,
        #[source]
        source: ArtifactError,
    },
    #[error("{stage}: hash config snapshot: {source}")]
    Hash {
        stage: StageName,
        #[source]
        source: serde_json::Error,
    },
}

/// What one completed stage produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: StageName,
    pub run_id: String,
    pub run_dir: PathBuf,
    pub action: OomGateAction,
    pub subsample_final: f64,
    /// Ranked winners, as original-matrix ids.
    pub winners: Vec<OriginalIndex>,
    pub fallback_full_grid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelReport {
    pub plan: FunnelPlan,
    pub stages: Vec<StageReport>,
}

impl FunnelReport {
    pub fn stage(&self, name: StageName) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// The confirmed ranking: Stage2's winners.
    pub fn final_winners(&self) -> &[OriginalIndex] {
        self.stage(StageName::Stage2Confirm)
            .map(|s| s.winners.as_slice())
            .unwrap_or(&[])
    }
}

struct StageOutcome {
    entries: Vec<WinnerEntry>,
    candidates: usize,
    params_effective: usize,
    score: &'static str,
    summary: StageSummary,
}

pub struct FunnelRunner<'k> {
    config: FunnelConfig,
    kernel: &'k dyn SimulationKernel,
    git: GitInfo,
}

impl<'k> FunnelRunner<'k> {
    pub fn new(
        config: FunnelConfig,
        kernel: &'k dyn SimulationKernel,
    ) -> Result<Self, FunnelError> {
        config.validate()?;
        Ok(Self {
            config,
            kernel,
            git: GitInfo::detect(Path::new(".")),
        })
    }

    /// Override the detected repository state recorded in manifests.
    pub fn with_git(mut self, git: GitInfo) -> Self {
        self.git = git;
        self
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    pub fn run(
        &self,
        bars: &BarSeries,
        params: &ParameterMatrix,
    ) -> Result<FunnelReport, FunnelError> {
        let plan = build_plan_from_config(&self.config)?;
        let data_fingerprint = bars.fingerprint();
        info!(
            params = params.n_rows(),
            bars = bars.len(),
            base_rate = self.config.base_subsample_rate,
            kernel = self.kernel.name(),
            "funnel started"
        );

        let mut stages = Vec::with_capacity(StageName::ALL.len());
        let mut forwarded: Option<Vec<OriginalIndex>> = None;
        for spec in plan.stages() {
            let report = self.run_stage(spec, bars, params, forwarded.take(), &data_fingerprint)?;
            forwarded = Some(report.winners.clone());
            stages.push(report);
        }

        info!(
            winners = stages.last().map_or(0, |s| s.winners.len()),
            "funnel finished"
        );
        Ok(FunnelReport { plan, stages })
    }

    fn run_stage(
        &self,
        spec: &StageSpec,
        bars: &BarSeries,
        params: &ParameterMatrix,
        forwarded: Option<Vec<OriginalIndex>>,
        data_fingerprint: &str,
    ) -> Result<StageReport, FunnelError> {
        let stage = spec.name;
        let _span = info_span!("stage", stage = %stage).entered();
        let created_at = Utc::now();
        let started = Instant::now();

        let (inputs, fallback_full_grid) = self.stage_inputs(stage, forwarded)?;
        let param_count = inputs.as_ref().map_or(params.n_rows(), Vec::len);
        let planned = StageConfig::merge(&self.config, spec, bars.len(), param_count, inputs);

        let decision = decide(&planned, &self.config.gate.policy())
            .map_err(|source| FunnelError::Gate { stage, source })?;
        match decision.action {
            OomGateAction::Proceed => {}
            OomGateAction::AutoDownsample => warn!(
                planned = decision.planned_subsample,
                final_rate = decision.final_subsample,
                mem_est_mb = decision.mem_est_mb,
                "auto-downsampled"
            ),
            OomGateAction::Block => {
                error!(mem_est_mb = decision.mem_est_mb, reason = %decision.reason, "blocked");
                return Err(FunnelError::Blocked {
                    stage,
                    reason: decision.reason,
                });
            }
        }
        let cfg = decision.new_cfg.clone();

        let snapshot = cfg.snapshot();
        let hash = config_hash(&snapshot).map_err(|source| FunnelError::Hash { stage, source })?;
        let run_id = mint_run_id(stage, created_at, data_fingerprint);

        let global: Vec<OriginalIndex> = match &cfg.prev_stage_winners {
            Some(ids) => ids.clone(),
            None => (0..params.n_rows()).map(OriginalIndex).collect(),
        };
        let outcome = match stage {
            StageName::Stage0Coarse => proxy_stage(&cfg, bars, params, &global)?,
            StageName::Stage1Topk | StageName::Stage2Confirm => {
                self.grid_stage(&cfg, bars, params, &global, fallback_full_grid)?
            }
        };

        let finished_at = Utc::now();
        let winners = Winners {
            topk: outcome.entries,
            notes: WinnersNotes {
                schema: WINNERS_SCHEMA.to_string(),
                stage,
                score: outcome.score.to_string(),
                topk_requested: cfg.topk,
                candidates: outcome.candidates,
            },
        };
        let artifacts = RunArtifacts {
            manifest: RunManifest {
                schema_version: SCHEMA_VERSION,
                run_id: run_id.clone(),
                stage,
                created_at,
                finished_at,
                duration_secs: started.elapsed().as_secs_f64(),
                git: self.git.clone(),
                config_hash: hash.to_string(),
                subsample_planned: decision.planned_subsample,
                subsample_used: cfg.param_subsample_rate,
                params_total: cfg.param_count,
                params_effective: outcome.params_effective,
                bars: cfg.bar_count,
                data_fingerprint: data_fingerprint.to_string(),
                kernel: self.kernel.name().to_string(),
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            config_snapshot: snapshot,
            metrics: StageMetrics {
                stage,
                params_total: cfg.param_count,
                params_effective: outcome.params_effective,
                bars: cfg.bar_count,
                subsample_planned: decision.planned_subsample,
                subsample_final: decision.final_subsample,
                oom_gate: GateRecord::from(&decision),
                summary: outcome.summary,
            },
            winners,
        };

        let run_dir = self.config.output_dir.join(&run_id);
        write_run_artifacts(&run_dir, &artifacts)
            .map_err(|source| FunnelError::Artifacts { stage, source })?;

        let winners = artifacts.winners.ids();
        info!(
            run_id = %run_id,
            config_hash = hash.short(),
            effective = outcome.params_effective,
            winners = winners.len(),
            "stage complete"
        );
        Ok(StageReport {
            stage,
            run_id,
            run_dir,
            action: decision.action,
            subsample_final: decision.final_subsample,
            winners,
            fallback_full_grid,
        })
    }

    /// Rows a stage starts from: `None` is the full grid.
    fn stage_inputs(
        &self,
        stage: StageName,
        forwarded: Option<Vec<OriginalIndex>>,
    ) -> Result<(Option<Vec<OriginalIndex>>, bool), FunnelError> {
        match forwarded {
            None => Ok((None, false)),
            Some(ids) if ids.is_empty() && stage == StageName::Stage2Confirm => {
                match self.config.empty_winners {
                    EmptyWinnersPolicy::FallbackFullGrid => {
                        warn!("no winners forwarded; confirming the full grid");
                        Ok((None, true))
                    }
                    EmptyWinnersPolicy::Fail => Err(FunnelError::EmptyWinners { stage }),
                }
            }
            Some(mut ids) => {
                ids.sort_unstable();
                Ok((Some(ids), false))
            }
        }
    }

    fn grid_stage(
        &self,
        cfg: &StageConfig,
        bars: &BarSeries,
        params: &ParameterMatrix,
        global: &[OriginalIndex],
        fallback_full_grid: bool,
    ) -> Result<StageOutcome, FunnelError> {
        let stage = cfg.stage;
        let subset: Cow<'_, ParameterMatrix> = if cfg.prev_stage_winners.is_some() {
            Cow::Owned(params.select_rows(global))
        } else {
            Cow::Borrowed(params)
        };

        let grid = run_grid(
            bars,
            &subset,
            &cfg.costs.cost_model(),
            self.kernel,
            cfg.execution_options(),
        )
        .map_err(|source| FunnelError::Engine { stage, source })?;

        let ranked = rank_grid_winners(&grid.metrics, &grid.executed, cfg.topk);
        let entries: Vec<WinnerEntry> = ranked
            .iter()
            .enumerate()
            .map(|(rank, &local)| {
                let m = grid.metrics.get(local);
                WinnerEntry {
                    param_id: global[local.0],
                    rank: rank + 1,
                    score: m.net_profit,
                    trades: Some(m.trades),
                    max_drawdown: Some(m.max_drawdown),
                    params: WinnerEntry::param_values(subset.row(local.0)),
                }
            })
            .collect();

        Ok(StageOutcome {
            candidates: grid.executed.len(),
            params_effective: grid.selected.len(),
            score: "net_profit",
            summary: StageSummary::Grid {
                rows_executed: grid.executed.len(),
                degenerate_rows: grid.selected.len() - grid.executed.len(),
                total_trades: grid.metrics.total_trades(),
                fallback_full_grid,
                best_net_profit: entries.first().map(|w| w.score),
                perf: grid.perf,
            },
            entries,
        })
    }
}

fn proxy_stage(
    cfg: &StageConfig,
    bars: &BarSeries,
    params: &ParameterMatrix,
    global: &[OriginalIndex],
) -> Result<StageOutcome, FunnelError> {
    let stage = cfg.stage;
    let picked = subsample_indices(cfg.param_count, cfg.param_subsample_rate, cfg.subsample_seed)
        .map_err(|e| FunnelError::Engine {
            stage,
            source: e.into(),
        })?;
    let ids: Vec<OriginalIndex> = picked.iter().map(|&i| global[i]).collect();
    let sample = params.select_rows(&ids);

    // scorer ids are local to the sample
    let results: Vec<Stage0Result> = score_stage0(bars.close(), &sample)
        .into_iter()
        .map(|r| Stage0Result {
            param_id: ids[r.param_id.0],
            ..r
        })
        .collect();
    let neg_inf = results
        .iter()
        .filter(|r| r.proxy_value == f64::NEG_INFINITY)
        .count();

    let k = cfg.topk.unwrap_or(results.len());
    let entries: Vec<WinnerEntry> = select_topk(&results, k)
        .into_iter()
        .enumerate()
        .filter_map(|(rank, id)| {
            let r = results.iter().find(|r| r.param_id == id)?;
            Some(WinnerEntry {
                param_id: id,
                rank: rank + 1,
                score: r.proxy_value,
                trades: None,
                max_drawdown: None,
                params: WinnerEntry::param_values(params.row(id.0)),
            })
        })
        .collect();

    Ok(StageOutcome {
        candidates: results.len() - neg_inf,
        params_effective: ids.len(),
        score: "proxy_value",
        summary: StageSummary::Proxy {
            scored: results.len(),
            neg_inf,
            best_proxy: entries.first().map(|w| w.score),
        },
        entries,
    })
}
