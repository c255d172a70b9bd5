#![allow(dead_code)]
use std::collections::HashSet;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use parking_lot::Mutex;

use zendo_energy::domain::{
    timestamps_for_day, DailyProfile, Entity, Interval, Location, TimeSeriesPoint,
};
use zendo_energy::etl::{EtlContext, RunScope, Stage, StageError, StageKind, WeatherMode};
use zendo_energy::repo::{ConfigRegistry, MemoryStore};
use zendo_energy::simulation::SimulatorProfiles;
use zendo_energy::sources::{SourceError, WeatherSource};

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Well after every test date
pub fn later() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

/// Two customers sharing one site plus one elsewhere
pub fn sites() -> Vec<Entity> {
    vec![
        Entity {
            id: 1,
            name: "Big Ben".to_string(),
            location: Location::new(50.5, 0.1),
        },
        Entity {
            id: 2,
            name: "Big Ben annex".to_string(),
            location: Location::new(50.5, 0.1),
        },
        Entity {
            id: 3,
            name: "Tower".to_string(),
            location: Location::new(51.5, -0.12),
        },
    ]
}

/// Deterministic provider with a clear-sky day and a warm afternoon
#[derive(Default)]
pub struct FakeWeatherSource {
    pub failing_irradiance_days: Mutex<HashSet<NaiveDate>>,
    pub missing_hours: Mutex<HashSet<u32>>,
    pub irradiance_calls: AtomicUsize,
    pub temperature_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
}

impl FakeWeatherSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_irradiance_on(&self, day: NaiveDate) {
        self.failing_irradiance_days.lock().insert(day);
    }

    pub fn drop_hours(&self, hours: &[u32]) {
        self.missing_hours.lock().extend(hours.iter().copied());
    }

    pub fn ghi_at(ts: DateTime<Utc>) -> f64 {
        let h = ts.hour() as f64 + ts.minute() as f64 / 60.0;
        (900.0 * (PI * (h - 6.0) / 12.0).sin()).max(0.0)
    }

    pub fn temperature_at(hour: u32) -> f64 {
        18.0 + 8.0 * (2.0 * PI * (hour as f64 - 9.0) / 24.0).sin()
    }
}

#[async_trait]
impl WeatherSource for FakeWeatherSource {
    async fn solar_irradiance(
        &self,
        _location: Location,
        day: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesPoint>, SourceError> {
        self.irradiance_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_irradiance_days.lock().contains(&day) {
            return Err(SourceError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(timestamps_for_day(day, interval)
            .into_iter()
            .map(|ts| TimeSeriesPoint::new(ts, Self::ghi_at(ts)))
            .collect())
    }

    async fn hourly_temperature(
        &self,
        _location: Location,
        hour: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError> {
        self.temperature_calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_hours.lock().contains(&hour.hour()) {
            return Ok(None);
        }
        Ok(Some(Self::temperature_at(hour.hour())))
    }

    async fn daily_profile(
        &self,
        _location: Location,
        _day: NaiveDate,
    ) -> Result<DailyProfile, SourceError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(DailyProfile::new(12.0, 20.0, 16.0, 8.0).with_bounds(Some(9.0), Some(19.0)))
    }
}

pub fn context(
    store: Arc<MemoryStore>,
    source: Arc<FakeWeatherSource>,
    entities: Vec<Entity>,
    weather_mode: WeatherMode,
) -> EtlContext {
    EtlContext {
        store,
        registry: Arc::new(ConfigRegistry::new(entities)),
        source,
        profiles: Arc::new(SimulatorProfiles::default()),
        interval: Interval::FifteenMinutes,
        weather_mode,
    }
}

/// Stage that only counts invocations
pub struct CountingStage {
    pub kind: StageKind,
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingStage {
    pub fn boxed(kind: StageKind, calls: Arc<AtomicUsize>, fail: bool) -> Box<dyn Stage> {
        Box::new(Self { kind, calls, fail })
    }
}

#[async_trait]
impl Stage for CountingStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn run(&self, _ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(StageError::DataGap {
                stage: self.kind,
                date: scope.date,
            })
        } else {
            Ok(scope.grid.len())
        }
    }
}
