//! Series utilities: gap filling and rolling correlation.

pub mod interpolate;
pub mod pearson;

pub use interpolate::{
    dense_values, fill_grid, interpolate, interpolate_by, interpolate_steps,
    interpolate_time_series,
};
pub use pearson::{
    compute_correlations, correlation_fetch_window, index_series, pearson, CorrelationInputs,
    SeriesIndex, CORRELATION_WINDOW_HOURS,
};
