//! Grid execution engine and the kernel contract it drives.
//!
//! The engine owns everything around the per-row simulation: sorting,
//! indicator memoization, subsampling, trigger seeding, forced exits,
//! sanitization and scatter-back. The simulation itself sits behind
//! [`SimulationKernel`]; [`DonchianAtrKernel`] is the reference implementation.

pub mod accounting;
pub mod cost;
pub mod donchian_kernel;
pub mod grid;
pub mod kernel;
pub mod options;
pub mod perf;

pub use accounting::{max_drawdown, replay, Ledger, RoundTrip};
pub use cost::CostModel;
pub use donchian_kernel::DonchianAtrKernel;
pub use grid::{run_grid, EngineError, GridResult, RowDebug};
pub use kernel::{
    KernelInput, KernelMetrics, KernelObservability, KernelOutput, PrecomputedIndicators,
    SimulationKernel,
};
pub use options::ExecutionOptions;
pub use perf::{GridPerf, RowObservation};
