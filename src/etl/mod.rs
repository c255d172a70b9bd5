//! Daily ETL chain.
//!
//! Five stages run in dependency order for one calendar date:
//! irradiance and weather pull source data per unique location, consumption
//! and production simulate per entity from the persisted environment series,
//! and correlation reads everything back to compute rolling coefficients.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::domain::{
    current_interval_cutoff, run_grid, Entity, Interval, Location, SeriesKey, SparsePoint,
};
use crate::repo::{EntityRegistry, StoreError, TimeSeriesStore};
use crate::series::fill_grid;
use crate::simulation::SimulatorProfiles;
use crate::sources::WeatherSource;

pub mod consumption;
pub mod correlation;
pub mod error;
pub mod irradiance;
pub mod orchestrator;
pub mod production;
pub mod weather;

pub use consumption::ConsumptionStage;
pub use correlation::CorrelationStage;
pub use error::StageError;
pub use irradiance::IrradianceStage;
pub use orchestrator::{Pipeline, PipelineRun, PipelineState, StageOutcome, StageStatus};
pub use production::ProductionStage;
pub use weather::{WeatherMode, WeatherStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum StageKind {
    Irradiance,
    Weather,
    Consumption,
    Production,
    Correlation,
}

/// Collaborators shared by every stage
#[derive(Clone)]
pub struct EtlContext {
    pub store: Arc<dyn TimeSeriesStore>,
    pub registry: Arc<dyn EntityRegistry>,
    pub source: Arc<dyn WeatherSource>,
    pub profiles: Arc<SimulatorProfiles>,
    pub interval: Interval,
    pub weather_mode: WeatherMode,
}

/// What one pipeline pass covers
#[derive(Debug, Clone)]
pub struct RunScope {
    pub date: NaiveDate,
    pub now: DateTime<Utc>,
    /// Slots of `date` up to the current interval when `date` is today
    pub grid: Vec<DateTime<Utc>>,
}

impl RunScope {
    pub fn new(date: NaiveDate, interval: Interval, now: DateTime<Utc>) -> Self {
        Self {
            date,
            now,
            grid: run_grid(date, interval, now),
        }
    }

    pub fn is_today(&self) -> bool {
        self.date == self.now.date_naive()
    }

    /// Start of the slot in progress when the run is for today
    pub fn cutoff(&self, interval: Interval) -> Option<DateTime<Utc>> {
        self.is_today()
            .then(|| current_interval_cutoff(self.now, interval))
    }

    /// Half-open range covering the grid
    pub fn window(&self, interval: Interval) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = *self.grid.first()?;
        let last = *self.grid.last()?;
        Some((first, last + interval.duration()))
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Runs the stage for one date; returns the number of rows written
    async fn run(&self, ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError>;
}

/// One location per distinct site, in first-seen order
pub(crate) fn unique_locations(entities: &[Entity]) -> Vec<Location> {
    entities
        .iter()
        .map(|e| e.location)
        .unique_by(Location::key)
        .collect()
}

/// Persisted series aligned onto the run grid with gaps interpolated
pub(crate) async fn load_grid(
    ctx: &EtlContext,
    key: SeriesKey,
    scope: &RunScope,
) -> Result<Vec<SparsePoint>, StoreError> {
    let Some((start, end)) = scope.window(ctx.interval) else {
        return Ok(Vec::new());
    };
    let points = ctx.store.get_series(key, start, end).await?;
    Ok(fill_grid(&scope.grid, &points))
}

/// `DataGap` when entities were present but nothing was written
pub(crate) fn require_rows(
    stage: StageKind,
    scope: &RunScope,
    entities: usize,
    rows: usize,
) -> Result<usize, StageError> {
    if entities > 0 && rows == 0 {
        Err(StageError::DataGap {
            stage,
            date: scope.date,
        })
    } else {
        Ok(rows)
    }
}
