//! Rolling Pearson correlation over a trailing 24 hour window.
//!
//! Series are joined strictly by timestamp: a slot contributes a sample only
//! when both series have a value at exactly that instant.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::domain::{midnight, CorrelationPair, TimeSeriesPoint};

/// Length of the trailing window each coefficient is computed over
pub const CORRELATION_WINDOW_HOURS: i64 = 24;

/// Spread below this fraction of `n * Σx²` is treated as zero variance
const REL_VARIANCE_EPS: f64 = 1e-12;

pub type SeriesIndex = BTreeMap<DateTime<Utc>, f64>;

pub fn index_series(points: &[TimeSeriesPoint]) -> SeriesIndex {
    points.iter().map(|p| (p.timestamp, p.value)).collect()
}

/// Pearson r of two paired samples.
///
/// Returns `None` for fewer than two pairs or when either side is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    let spread_x = nf * sum_x2 - sum_x * sum_x;
    let spread_y = nf * sum_y2 - sum_y * sum_y;
    if spread_x <= REL_VARIANCE_EPS * nf * sum_x2 || spread_y <= REL_VARIANCE_EPS * nf * sum_y2 {
        return None;
    }

    let num = nf * sum_xy - sum_x * sum_y;
    Some((num / (spread_x * spread_y).sqrt()).clamp(-1.0, 1.0))
}

/// The four persisted series one entity's correlations are computed from
#[derive(Debug, Clone, Default)]
pub struct CorrelationInputs {
    pub irradiance: SeriesIndex,
    pub production: SeriesIndex,
    pub temperature: SeriesIndex,
    pub consumption: SeriesIndex,
}

impl CorrelationInputs {
    /// No environmental data at all: nothing can be correlated
    pub fn lacks_sources(&self) -> bool {
        self.irradiance.is_empty() && self.temperature.is_empty()
    }
}

/// Fetch window for `day`: the whole previous day through the end of `day`,
/// so the first slot has a full trailing window available.
pub fn correlation_fetch_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = midnight(day) - Duration::days(1);
    (start, midnight(day) + Duration::days(1))
}

fn paired_window(
    xs: &SeriesIndex,
    ys: &SeriesIndex,
    end: DateTime<Utc>,
) -> (Vec<f64>, Vec<f64>) {
    let start = end - Duration::hours(CORRELATION_WINDOW_HOURS);
    xs.range((Bound::Excluded(start), Bound::Included(end)))
        .filter_map(|(ts, x)| ys.get(ts).map(|y| (*x, *y)))
        .unzip()
}

/// One [`CorrelationPair`] per grid slot, whatever data is available.
pub fn compute_correlations(
    grid: &[DateTime<Utc>],
    inputs: &CorrelationInputs,
) -> Vec<CorrelationPair> {
    grid.iter()
        .map(|&ts| {
            let (irr, prod) = paired_window(&inputs.irradiance, &inputs.production, ts);
            let (temp, cons) = paired_window(&inputs.temperature, &inputs.consumption, ts);
            CorrelationPair {
                timestamp: ts,
                irradiance_vs_production: pearson(&irr, &prod),
                temperature_vs_consumption: pearson(&temp, &cons),
            }
        })
        .collect()
}
