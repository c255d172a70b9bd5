//! Gap filling for gridded series.
//!
//! Interior gaps are filled by strict linear interpolation between the
//! nearest known neighbours. Leading and trailing gaps take the value of
//! their only anchor. A series without any known value stays empty-valued.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{SparsePoint, TimeSeriesPoint};

/// Values for a run of `steps` missing slots between `left` and `right`
pub fn interpolate_steps(left: Option<f64>, right: Option<f64>, steps: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(steps);
    fill_gap(&mut out, left, right, steps);
    out
}

fn fill_gap(out: &mut Vec<Option<f64>>, left: Option<f64>, right: Option<f64>, steps: usize) {
    if steps == 0 {
        return;
    }
    match (left, right) {
        (Some(l), Some(r)) => {
            let step = (r - l) / (steps + 1) as f64;
            out.extend((1..=steps).map(|i| Some(l + step * i as f64)));
        }
        (l, r) => out.extend(std::iter::repeat(l.or(r)).take(steps)),
    }
}

/// Fill gaps in `values` in a single pass. The input is left untouched.
pub fn interpolate(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut left = None;
    let mut pending = 0usize;

    for &value in values {
        match value {
            Some(right) => {
                fill_gap(&mut out, left, Some(right), pending);
                pending = 0;
                out.push(Some(right));
                left = Some(right);
            }
            None => pending += 1,
        }
    }
    fill_gap(&mut out, left, None, pending);

    out
}

/// Interpolate one numeric field of arbitrary records.
///
/// Records are cloned; every other field is carried over unchanged.
pub fn interpolate_by<T, G, S>(items: &[T], get: G, set: S) -> Vec<T>
where
    T: Clone,
    G: Fn(&T) -> Option<f64>,
    S: Fn(&mut T, Option<f64>),
{
    let raw: Vec<Option<f64>> = items.iter().map(get).collect();
    items
        .iter()
        .zip(interpolate(&raw))
        .map(|(item, value)| {
            let mut item = item.clone();
            set(&mut item, value);
            item
        })
        .collect()
}

pub fn interpolate_time_series(points: &[SparsePoint]) -> Vec<SparsePoint> {
    interpolate_by(points, |p| p.value, |p, v| p.value = v)
}

/// Align `points` onto `grid` and fill the slots nothing was reported for.
///
/// Points whose timestamp is not on the grid are ignored.
pub fn fill_grid(grid: &[DateTime<Utc>], points: &[TimeSeriesPoint]) -> Vec<SparsePoint> {
    let by_ts: HashMap<DateTime<Utc>, f64> =
        points.iter().map(|p| (p.timestamp, p.value)).collect();
    let sparse: Vec<SparsePoint> = grid
        .iter()
        .map(|ts| TimeSeriesPoint::new(*ts, by_ts.get(ts).copied()))
        .collect();
    interpolate_time_series(&sparse)
}

/// Values of a gap-filled series, or `None` if any slot is still unresolved
pub fn dense_values(points: &[SparsePoint]) -> Option<Vec<f64>> {
    points.iter().map(|p| p.value).collect()
}
