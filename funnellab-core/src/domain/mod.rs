//! Domain types for the funnel engine.

pub mod bar;
pub mod fill;
pub mod ids;
pub mod metrics;
pub mod params;

pub use bar::{BarSeries, DataError};
pub use fill::{Fill, Side};
pub use ids::{OriginalIndex, ParamId, Permutation, SortedPos};
pub use metrics::{finite_or_zero, MetricsMatrix, MetricsRow};
pub use params::{window_fits, window_len, ParamRow, ParamShapeError, ParameterMatrix};
