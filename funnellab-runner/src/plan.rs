//! Funnel plan: the fixed three-stage schedule.
//!
//! | stage            | rate              | topk       |
//! |------------------|-------------------|------------|
//! | `stage0_coarse`  | base              | stage0_topk|
//! | `stage1_topk`    | min(1, 2 × base)  | stage1_topk|
//! | `stage2_confirm` | 1.0               | none       |
//!
//! Only the base rate and the two Top-K sizes are configurable.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FunnelConfig;

pub const DEFAULT_STAGE0_TOPK: usize = 50;
pub const DEFAULT_STAGE1_TOPK: usize = 20;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("base subsample rate must be in (0, 1], got {0}")]
    InvalidBaseRate(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageName {
    #[serde(rename = "stage0_coarse")]
    Stage0Coarse,
    #[serde(rename = "stage1_topk")]
    Stage1Topk,
    #[serde(rename = "stage2_confirm")]
    Stage2Confirm,
}

impl StageName {
    pub const ALL: [StageName; 3] = [
        StageName::Stage0Coarse,
        StageName::Stage1Topk,
        StageName::Stage2Confirm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Stage0Coarse => "stage0_coarse",
            StageName::Stage1Topk => "stage1_topk",
            StageName::Stage2Confirm => "stage2_confirm",
        }
    }

    pub fn index(self) -> usize {
        match self {
            StageName::Stage0Coarse => 0,
            StageName::Stage1Topk => 1,
            StageName::Stage2Confirm => 2,
        }
    }

    /// Stage2 is the full confirmation and may not be thinned.
    pub fn allows_downsample(self) -> bool {
        self != StageName::Stage2Confirm
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: StageName,
    pub param_subsample_rate: f64,
    pub topk: Option<usize>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelPlan {
    stages: [StageSpec; 3],
}

impl FunnelPlan {
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn stage(&self, name: StageName) -> &StageSpec {
        &self.stages[name.index()]
    }
}

/// Build the plan for a base rate and the two Top-K sizes.
pub fn build_plan(
    base_rate: f64,
    stage0_topk: usize,
    stage1_topk: usize,
) -> Result<FunnelPlan, PlanError> {
    if !(base_rate.is_finite() && base_rate > 0.0 && base_rate <= 1.0) {
        return Err(PlanError::InvalidBaseRate(base_rate));
    }
    let stage1_rate = (2.0 * base_rate).min(1.0);
    Ok(FunnelPlan {
        stages: [
            StageSpec {
                name: StageName::Stage0Coarse,
                param_subsample_rate: base_rate,
                topk: Some(stage0_topk),
                notes: "proxy scoring over a subsample of the full grid".to_string(),
            },
            StageSpec {
                name: StageName::Stage1Topk,
                param_subsample_rate: stage1_rate,
                topk: Some(stage1_topk),
                notes: "grid run over stage0 winners".to_string(),
            },
            StageSpec {
                name: StageName::Stage2Confirm,
                param_subsample_rate: 1.0,
                topk: None,
                notes: "full confirmation of stage1 winners".to_string(),
            },
        ],
    })
}

pub fn build_plan_from_config(config: &FunnelConfig) -> Result<FunnelPlan, PlanError> {
    build_plan(
        config.base_subsample_rate,
        config.stage0_topk,
        config.stage1_topk,
    )
}
