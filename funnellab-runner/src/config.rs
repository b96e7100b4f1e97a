//! Funnel configuration, loaded from TOML.
//!
//! Every behaviour switch is an explicit field with a serde default; nothing
//! is read from the process environment.
//!
//! ```toml
//! base_subsample_rate = 0.25
//! stage0_topk = 50
//! stage1_topk = 20
//! subsample_seed = 42
//! empty_winners = "fallback_full_grid"
//! output_dir = "artifacts/funnel"
//!
//! [costs]
//! commission = 1.0
//! slippage = 0.01
//! order_qty = 1.0
//!
//! [gate]
//! mem_limit_mb = 2048.0
//! allow_auto_downsample = true
//! downsample_step = 0.5
//! downsample_min = 0.01
//!
//! [execution]
//! sort_params = true
//! force_close_last = false
//! trigger_rate = 1.0
//! trigger_seed = 7
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use funnellab_core::engine::CostModel;

use crate::oom_gate::GatePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse funnel TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What Stage2 does when Stage1 hands over no winners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyWinnersPolicy {
    /// Confirm the whole original grid instead.
    #[default]
    FallbackFullGrid,
    /// Abort the funnel.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub commission: f64,
    pub slippage: f64,
    pub order_qty: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            commission: 0.0,
            slippage: 0.0,
            order_qty: 1.0,
        }
    }
}

impl CostConfig {
    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.commission, self.slippage, self.order_qty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub mem_limit_mb: f64,
    pub allow_auto_downsample: bool,
    pub downsample_step: f64,
    pub downsample_min: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            mem_limit_mb: 2048.0,
            allow_auto_downsample: true,
            downsample_step: 0.5,
            downsample_min: 0.01,
        }
    }
}

impl GateConfig {
    pub fn policy(&self) -> GatePolicy {
        GatePolicy {
            mem_limit_mb: self.mem_limit_mb,
            allow_auto_downsample: self.allow_auto_downsample,
            downsample_step: self.downsample_step,
            downsample_min: self.downsample_min,
        }
    }
}

/// Engine switches shared by the grid stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub sort_params: bool,
    pub force_close_last: bool,
    pub collect_perf: bool,
    pub trigger_rate: f64,
    pub trigger_seed: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            sort_params: true,
            force_close_last: false,
            collect_perf: true,
            trigger_rate: 1.0,
            trigger_seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    /// Stage0 subsample rate, in `(0, 1]`.
    pub base_subsample_rate: f64,
    pub stage0_topk: usize,
    pub stage1_topk: usize,
    pub subsample_seed: u64,
    pub empty_winners: EmptyWinnersPolicy,
    pub output_dir: PathBuf,
    pub costs: CostConfig,
    pub gate: GateConfig,
    pub execution: ExecutionConfig,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            base_subsample_rate: 0.25,
            stage0_topk: 50,
            stage1_topk: 20,
            subsample_seed: 42,
            empty_winners: EmptyWinnersPolicy::default(),
            output_dir: PathBuf::from("artifacts/funnel"),
            costs: CostConfig::default(),
            gate: GateConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl FunnelConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = self.base_subsample_rate;
        if !(r.is_finite() && r > 0.0 && r <= 1.0) {
            return Err(invalid("base_subsample_rate", format!("must be in (0, 1], got {r}")));
        }
        if let Some((field, value)) = self.costs.cost_model().invalid_field() {
            return Err(invalid(field, format!("out of range: {value}")));
        }
        let t = self.execution.trigger_rate;
        if !(0.0..=1.0).contains(&t) {
            return Err(invalid("execution.trigger_rate", format!("must be in [0, 1], got {t}")));
        }
        self.gate
            .policy()
            .validate()
            .map_err(|e| invalid("gate", e.to_string()))?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
