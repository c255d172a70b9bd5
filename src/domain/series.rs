use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, LocationKey};

/// One sample of a gridded series.
///
/// `V` is `f64` for dense, computed series and `Option<f64>` while a series
/// still has gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint<V = f64> {
    pub timestamp: DateTime<Utc>,
    pub value: V,
}

impl<V> TimeSeriesPoint<V> {
    pub fn new(timestamp: DateTime<Utc>, value: V) -> Self {
        Self { timestamp, value }
    }
}

/// Gap-prone point as delivered by a source or read back from the store
pub type SparsePoint = TimeSeriesPoint<Option<f64>>;

/// Four anchor temperatures (°C) describing one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyProfile {
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
    pub night: f64,
    pub t_min: Option<f64>,
    pub t_max: Option<f64>,
}

impl DailyProfile {
    pub fn new(morning: f64, afternoon: f64, evening: f64, night: f64) -> Self {
        Self {
            morning,
            afternoon,
            evening,
            night,
            t_min: None,
            t_max: None,
        }
    }

    pub fn with_bounds(mut self, t_min: Option<f64>, t_max: Option<f64>) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }
}

/// Rolling correlation coefficients for one grid slot of one entity.
///
/// Each coefficient is `None` when it is undefined for the window (fewer
/// than two paired samples or a constant series).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub timestamp: DateTime<Utc>,
    pub irradiance_vs_production: Option<f64>,
    pub temperature_vs_consumption: Option<f64>,
}

/// Identifies one persisted series; unique together with the timestamp.
///
/// Environmental series are stored per location so customers sharing a site
/// share one fetch; energy series are stored per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesKey {
    Irradiance(LocationKey),
    Temperature(LocationKey),
    Consumption(EntityId),
    Production(EntityId),
}

impl SeriesKey {
    pub fn kind(&self) -> &'static str {
        match self {
            SeriesKey::Irradiance(_) => "irradiance",
            SeriesKey::Temperature(_) => "temperature",
            SeriesKey::Consumption(_) => "consumption",
            SeriesKey::Production(_) => "production",
        }
    }
}
