//! OOM Gate: admission control for one stage.
//!
//! Estimates the stage's working set from its row and bar counts and decides
//! PROCEED, AUTO_DOWNSAMPLE or BLOCK against a memory budget. The estimate is
//! advisory: PROCEED is not a reservation.
//!
//! Estimator, with `effective = selected_count(param_count, rate)`:
//!
//! ```text
//! mem_bytes = bars·4·8                      OHLC columns
//!           + param_count·3·8               metrics table
//!           + effective·bars·8·4            per-row working series
//! ops_est   = effective·bars
//! ```
//!
//! Downsampling multiplies the rate by `downsample_step` until the estimate
//! fits, never going below `downsample_min`. The confirmation stage is never
//! downsampled; it either fits or blocks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use funnellab_core::subsample::selected_count;

use crate::stage_config::StageConfig;

/// f64 series each executed row keeps alive: equity, triggers, intents, fills.
pub const WORKING_SERIES: u64 = 4;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error, PartialEq)]
pub enum GateError {
    #[error("mem_limit_mb must be positive and finite, got {0}")]
    InvalidLimit(f64),
    #[error("downsample_step must be in (0, 1), got {0}")]
    InvalidStep(f64),
    #[error("downsample_min must be in (0, 1], got {0}")]
    InvalidMin(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub mem_limit_mb: f64,
    pub allow_auto_downsample: bool,
    pub downsample_step: f64,
    pub downsample_min: f64,
}

impl GatePolicy {
    pub fn validate(&self) -> Result<(), GateError> {
        if !(self.mem_limit_mb.is_finite() && self.mem_limit_mb > 0.0) {
            return Err(GateError::InvalidLimit(self.mem_limit_mb));
        }
        if !(self.downsample_step > 0.0 && self.downsample_step < 1.0) {
            return Err(GateError::InvalidStep(self.downsample_step));
        }
        if !(self.downsample_min > 0.0 && self.downsample_min <= 1.0) {
            return Err(GateError::InvalidMin(self.downsample_min));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OomGateAction {
    Proceed,
    AutoDownsample,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub mem_bytes: u64,
    pub mem_est_mb: f64,
    pub ops_est: u64,
}

pub fn estimate(param_count: usize, bar_count: usize, rate: f64) -> ResourceEstimate {
    let bars = bar_count as u64;
    let params = param_count as u64;
    let effective = selected_count(param_count, rate) as u64;
    let f = std::mem::size_of::<f64>() as u64;
    let mem_bytes = bars * 4 * f + params * 3 * f + effective * bars * f * WORKING_SERIES;
    ResourceEstimate {
        mem_bytes,
        mem_est_mb: mem_bytes as f64 / BYTES_PER_MB,
        ops_est: effective * bars,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OomGateDecision {
    pub action: OomGateAction,
    pub reason: String,
    pub mem_est_mb: f64,
    pub ops_est: u64,
    pub planned_subsample: f64,
    pub final_subsample: f64,
    /// Complete replacement config; the caller adopts it as-is.
    pub new_cfg: StageConfig,
}

pub fn decide(cfg: &StageConfig, policy: &GatePolicy) -> Result<OomGateDecision, GateError> {
    policy.validate()?;
    let planned = cfg.param_subsample_rate;
    let limit = policy.mem_limit_mb;
    let est = estimate(cfg.param_count, cfg.bar_count, planned);

    let decision = |action, reason: String, est: ResourceEstimate, rate: f64| OomGateDecision {
        action,
        reason,
        mem_est_mb: est.mem_est_mb,
        ops_est: est.ops_est,
        planned_subsample: planned,
        final_subsample: rate,
        new_cfg: StageConfig {
            param_subsample_rate: rate,
            ..cfg.clone()
        },
    };

    if est.mem_est_mb <= limit {
        let reason = format!("estimate {:.1} MB within limit {limit:.1} MB", est.mem_est_mb);
        return Ok(decision(OomGateAction::Proceed, reason, est, planned));
    }

    if !policy.allow_auto_downsample || !cfg.stage.allows_downsample() {
        let why = if policy.allow_auto_downsample {
            "stage may not be downsampled"
        } else {
            "auto-downsample disabled"
        };
        let reason = format!(
            "estimate {:.1} MB exceeds limit {limit:.1} MB at rate {planned}; {why}",
            est.mem_est_mb
        );
        return Ok(decision(OomGateAction::Block, reason, est, planned));
    }

    let mut rate = planned;
    while rate > policy.downsample_min {
        rate = (rate * policy.downsample_step).max(policy.downsample_min);
        let trial = estimate(cfg.param_count, cfg.bar_count, rate);
        if trial.mem_est_mb <= limit {
            let reason = format!(
                "estimate {:.1} MB exceeds limit {limit:.1} MB at rate {planned}; \
                 downsampled to {rate} ({:.1} MB)",
                est.mem_est_mb, trial.mem_est_mb
            );
            return Ok(decision(OomGateAction::AutoDownsample, reason, trial, rate));
        }
    }

    let floor = estimate(cfg.param_count, cfg.bar_count, policy.downsample_min.min(planned));
    let reason = format!(
        "estimate {:.1} MB exceeds limit {limit:.1} MB even at minimum rate {} ({:.1} MB)",
        est.mem_est_mb, policy.downsample_min, floor.mem_est_mb
    );
    Ok(decision(OomGateAction::Block, reason, floor, planned))
}
