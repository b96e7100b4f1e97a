//! Per-stage run artifacts.
//!
//! Each completed stage gets one run directory holding:
//!
//! - `manifest.json`: identity, git state, timing, subsample used, data fingerprint
//! - `config_snapshot.json`: the array-free stage config that was hashed
//! - `metrics.json`: counts, planned vs final rate, OOM gate record, stage summary
//! - `winners.json`: `{"topk": [...], "notes": {"schema": "v1", ...}}`
//!
//! Directories are write-once. Files are first written into a sibling
//! `<run_id>.partial` directory which is renamed into place only after every
//! file succeeded, so a reader never sees a half-written run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use funnellab_core::domain::OriginalIndex;
use funnellab_core::engine::GridPerf;

use crate::oom_gate::{OomGateAction, OomGateDecision};
use crate::plan::StageName;
use crate::stage_config::ConfigSnapshot;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;
pub const WINNERS_SCHEMA: &str = "v1";

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CONFIG_SNAPSHOT_FILE: &str = "config_snapshot.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const WINNERS_FILE: &str = "winners.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("run directory {0} already exists")]
    AlreadyExists(PathBuf),
    #[error("run directory {0} has no file name")]
    InvalidRunDir(PathBuf),
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize {file}: {source}")]
    Serialize {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Repository state at run time. Both fields are `None` outside a git checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

impl GitInfo {
    /// Best effort: any failure to run git yields empty fields.
    pub fn detect(dir: &Path) -> Self {
        let commit = git(dir, &["rev-parse", "HEAD"]);
        let dirty = commit
            .as_ref()
            .and_then(|_| git(dir, &["status", "--porcelain"]))
            .map(|out| !out.is_empty());
        Self { commit, dirty }
    }
}

fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub stage: StageName,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub git: GitInfo,
    pub config_hash: String,
    pub subsample_planned: f64,
    pub subsample_used: f64,
    pub params_total: usize,
    pub params_effective: usize,
    pub bars: usize,
    pub data_fingerprint: String,
    pub kernel: String,
    pub crate_version: String,
}

/// The gate's decision as recorded in `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
    pub action: OomGateAction,
    pub reason: String,
    pub mem_est_mb: f64,
    pub ops_est: u64,
}

impl From<&OomGateDecision> for GateRecord {
    fn from(d: &OomGateDecision) -> Self {
        Self {
            action: d.action,
            reason: d.reason.clone(),
            mem_est_mb: d.mem_est_mb,
            ops_est: d.ops_est,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageSummary {
    Proxy {
        scored: usize,
        neg_inf: usize,
        best_proxy: Option<f64>,
    },
    Grid {
        rows_executed: usize,
        degenerate_rows: usize,
        total_trades: u64,
        fallback_full_grid: bool,
        best_net_profit: Option<f64>,
        perf: Option<GridPerf>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: StageName,
    pub params_total: usize,
    pub params_effective: usize,
    pub bars: usize,
    pub subsample_planned: f64,
    pub subsample_final: f64,
    pub oom_gate: GateRecord,
    pub summary: StageSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub param_id: OriginalIndex,
    pub rank: usize,
    /// Proxy value for Stage0, net profit for grid stages.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trades: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_drawdown: Option<f64>,
    /// Parameter row as run. Non-finite values are recorded as `null`.
    pub params: Vec<Option<f64>>,
}

impl WinnerEntry {
    pub fn param_values(row: &[f64]) -> Vec<Option<f64>> {
        row.iter().map(|v| v.is_finite().then_some(*v)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnersNotes {
    pub schema: String,
    pub stage: StageName,
    pub score: String,
    pub topk_requested: Option<usize>,
    pub candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winners {
    pub topk: Vec<WinnerEntry>,
    pub notes: WinnersNotes,
}

impl Winners {
    pub fn ids(&self) -> Vec<OriginalIndex> {
        self.topk.iter().map(|w| w.param_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    pub manifest: RunManifest,
    pub config_snapshot: ConfigSnapshot,
    pub metrics: StageMetrics,
    pub winners: Winners,
}

/// Persist all four files into `run_dir`, atomically at directory granularity.
pub fn write_run_artifacts(run_dir: &Path, artifacts: &RunArtifacts) -> Result<(), ArtifactError> {
    if run_dir.exists() {
        return Err(ArtifactError::AlreadyExists(run_dir.to_path_buf()));
    }
    let name = run_dir
        .file_name()
        .ok_or_else(|| ArtifactError::InvalidRunDir(run_dir.to_path_buf()))?;
    let mut staging_name = name.to_os_string();
    staging_name.push(".partial");
    let staging = run_dir.with_file_name(staging_name);

    if staging.exists() {
        // leftover from an interrupted write
        fs::remove_dir_all(&staging).map_err(|source| io_err(&staging, source))?;
    }
    fs::create_dir_all(&staging).map_err(|source| io_err(&staging, source))?;

    let written = write_files(&staging, artifacts)
        .and_then(|()| fs::rename(&staging, run_dir).map_err(|source| io_err(run_dir, source)));
    if let Err(e) = written {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    info!(
        run_id = %artifacts.manifest.run_id,
        stage = %artifacts.manifest.stage,
        dir = %run_dir.display(),
        "run artifacts written"
    );
    Ok(())
}

fn write_files(dir: &Path, artifacts: &RunArtifacts) -> Result<(), ArtifactError> {
    write_json(dir, MANIFEST_FILE, &artifacts.manifest)?;
    write_json(dir, CONFIG_SNAPSHOT_FILE, &artifacts.config_snapshot)?;
    write_json(dir, METRICS_FILE, &artifacts.metrics)?;
    write_json(dir, WINNERS_FILE, &artifacts.winners)?;
    Ok(())
}

fn write_json<T: Serialize>(
    dir: &Path,
    file: &'static str,
    value: &T,
) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|source| ArtifactError::Serialize { file, source })?;
    let path = dir.join(file);
    fs::write(&path, json).map_err(|source| io_err(&path, source))
}

fn io_err(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Load a stage's winners back, e.g. for downstream consumers.
pub fn read_winners(run_dir: &Path) -> Result<Winners, ArtifactError> {
    let path = run_dir.join(WINNERS_FILE);
    let content = fs::read_to_string(&path).map_err(|source| io_err(&path, source))?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Serialize {
        file: WINNERS_FILE,
        source,
    })
}
