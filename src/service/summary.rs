//! Daily energy totals and raw history for one entity, read back from the store.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    day_window, CorrelationPair, Entity, EntityId, Interval, SeriesKey, TimeSeriesPoint,
};
use crate::repo::{EntityRegistry, StoreError, TimeSeriesStore};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummaryError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySummary {
    pub entity_id: EntityId,
    pub date: NaiveDate,
    pub total_production_kwh: f64,
    pub total_consumption_kwh: f64,
    /// Production minus consumption
    pub net_kwh: f64,
    /// Latest ambient temperature of the day (°C)
    pub last_temperature: Option<f64>,
    /// Latest correlation row of the day
    pub correlation: Option<CorrelationPair>,
}

/// Every stored series for one entity-day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyHistory {
    pub entity_id: EntityId,
    pub date: NaiveDate,
    pub production: Vec<TimeSeriesPoint>,
    pub consumption: Vec<TimeSeriesPoint>,
    pub temperature: Vec<TimeSeriesPoint>,
    pub irradiance: Vec<TimeSeriesPoint>,
    pub correlation: Option<CorrelationPair>,
}

pub struct EnergySummaryService {
    store: Arc<dyn TimeSeriesStore>,
    registry: Arc<dyn EntityRegistry>,
    interval: Interval,
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// kWh from power samples of `interval` length
fn energy_kwh(points: &[TimeSeriesPoint], interval: Interval) -> f64 {
    round3(points.iter().map(|p| p.value).sum::<f64>() * interval.hours())
}

impl EnergySummaryService {
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        registry: Arc<dyn EntityRegistry>,
        interval: Interval,
    ) -> Self {
        Self {
            store,
            registry,
            interval,
        }
    }

    async fn entity(&self, entity_id: EntityId) -> Result<Entity, SummaryError> {
        self.registry
            .get_entity(entity_id)
            .await?
            .ok_or(SummaryError::EntityNotFound(entity_id))
    }

    pub async fn daily_summary(
        &self,
        entity_id: EntityId,
        date: NaiveDate,
    ) -> Result<EnergySummary, SummaryError> {
        let entity = self.entity(entity_id).await?;
        let (start, end) = day_window(date);

        let production = self
            .store
            .get_series(SeriesKey::Production(entity_id), start, end)
            .await?;
        let consumption = self
            .store
            .get_series(SeriesKey::Consumption(entity_id), start, end)
            .await?;
        let temperatures = self
            .store
            .get_series(SeriesKey::Temperature(entity.location.key()), start, end)
            .await?;
        let correlations = self.store.get_correlations(entity_id, start, end).await?;

        let total_production_kwh = energy_kwh(&production, self.interval);
        let total_consumption_kwh = energy_kwh(&consumption, self.interval);

        Ok(EnergySummary {
            entity_id,
            date,
            total_production_kwh,
            total_consumption_kwh,
            net_kwh: round3(total_production_kwh - total_consumption_kwh),
            last_temperature: temperatures.last().map(|p| p.value),
            correlation: correlations.last().copied(),
        })
    }

    /// Stored production, consumption, temperature and irradiance for the
    /// day plus its latest correlation row
    pub async fn daily_history(
        &self,
        entity_id: EntityId,
        date: NaiveDate,
    ) -> Result<DailyHistory, SummaryError> {
        let entity = self.entity(entity_id).await?;
        let (start, end) = day_window(date);
        let location = entity.location.key();
        let fetch = |key| self.store.get_series(key, start, end);

        Ok(DailyHistory {
            entity_id,
            date,
            production: fetch(SeriesKey::Production(entity_id)).await?,
            consumption: fetch(SeriesKey::Consumption(entity_id)).await?,
            temperature: fetch(SeriesKey::Temperature(location)).await?,
            irradiance: fetch(SeriesKey::Irradiance(location)).await?,
            correlation: self
                .store
                .get_correlations(entity_id, start, end)
                .await?
                .last()
                .copied(),
        })
    }
}
