//! FunnelLab Core: the pure-computation half of the parameter funnel.
//!
//! - Domain types: bars, parameter matrix, the two row-index spaces, metrics
//! - Indicator library (Donchian, Wilder ATR, SMA) and the per-run indicator cache
//! - Cache-friendly sorter, deterministic subsampler, sparse trigger masker
//! - Stage0 proxy scorer and Top-K selection
//! - Grid engine with the simulation-kernel contract and a reference kernel
//!
//! Nothing here touches the filesystem; orchestration and artifacts live in
//! `funnellab-runner`.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod mask;
pub mod rng;
pub mod sort;
pub mod stage0;
pub mod subsample;
pub mod topk;
