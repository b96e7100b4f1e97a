//! FunnelLab Runner: staged parameter search on top of `funnellab-core`.
//!
//! This crate provides:
//! - The fixed three-stage funnel plan (coarse proxy, Top-K grid, confirmation)
//! - Per-stage config merging, hashing and run-id minting
//! - The OOM gate that admits, downsamples or blocks each stage
//! - Write-once run artifacts (manifest, config snapshot, metrics, winners)
//! - `FunnelRunner`, which drives the stages and forwards winners

pub mod artifacts;
pub mod config;
pub mod fingerprint;
pub mod oom_gate;
pub mod plan;
pub mod runner;
pub mod stage_config;

pub use artifacts::{
    read_winners, write_run_artifacts, ArtifactError, GateRecord, GitInfo, RunArtifacts,
    RunManifest, StageMetrics, StageSummary, WinnerEntry, Winners, SCHEMA_VERSION,
};
pub use config::{
    ConfigError, CostConfig, EmptyWinnersPolicy, ExecutionConfig, FunnelConfig, GateConfig,
};
pub use fingerprint::{config_hash, mint_run_id, ConfigHash};
pub use oom_gate::{decide, estimate, GateError, GatePolicy, OomGateAction, OomGateDecision};
pub use plan::{build_plan, build_plan_from_config, FunnelPlan, PlanError, StageName, StageSpec};
pub use runner::{FunnelError, FunnelReport, FunnelRunner, StageReport};
pub use stage_config::{ConfigSnapshot, StageConfig};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<FunnelConfig>();
        assert_sync::<FunnelConfig>();
        assert_send::<StageConfig>();
        assert_sync::<StageConfig>();
    }

    #[test]
    fn runner_is_send_sync() {
        assert_send::<FunnelRunner<'static>>();
        assert_sync::<FunnelRunner<'static>>();
    }

    #[test]
    fn artifact_types_are_send_sync() {
        assert_send::<RunArtifacts>();
        assert_sync::<RunArtifacts>();
        assert_send::<FunnelReport>();
        assert_sync::<FunnelReport>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<FunnelError>();
        assert_sync::<FunnelError>();
    }
}
