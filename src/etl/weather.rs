use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use super::{require_rows, unique_locations, EtlContext, RunScope, Stage, StageError, StageKind};
use crate::domain::{floor_to_hour, Location, SeriesKey, TimeSeriesPoint};
use crate::series::{dense_values, interpolate_time_series};
use crate::simulation::{WeatherParams, WeatherSimulator};

/// Where ambient temperatures come from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WeatherMode {
    /// Hourly historical observations fanned out to every slot of the hour
    #[default]
    Observed,
    /// Intraday curve fitted to the provider's day summary
    Synthetic,
}

/// Builds the ambient temperature grid per unique location
pub struct WeatherStage;

impl WeatherStage {
    async fn observed(
        ctx: &EtlContext,
        scope: &RunScope,
        location: Location,
    ) -> Option<Vec<TimeSeriesPoint>> {
        let per_hour = ctx.interval.per_hour();
        let mut slots_by_hour: BTreeMap<DateTime<Utc>, Vec<DateTime<Utc>>> = BTreeMap::new();
        for ts in &scope.grid {
            slots_by_hour
                .entry(floor_to_hour(*ts))
                .or_insert_with(|| Vec::with_capacity(per_hour))
                .push(*ts);
        }

        let mut readings: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for (hour, slots) in &slots_by_hour {
            match ctx.source.hourly_temperature(location, *hour).await {
                Ok(Some(temp)) => readings.extend(slots.iter().map(|ts| (*ts, temp))),
                Ok(None) => debug!(%location, %hour, "no observation for hour"),
                Err(e) => warn!(%location, %hour, error = %e, "temperature fetch failed; skipping hour"),
            }
        }

        let sparse: Vec<_> = scope
            .grid
            .iter()
            .map(|ts| TimeSeriesPoint::new(*ts, readings.get(ts).copied()))
            .collect();
        let values = dense_values(&interpolate_time_series(&sparse))?;
        Some(
            scope
                .grid
                .iter()
                .zip(values)
                .map(|(ts, v)| TimeSeriesPoint::new(*ts, v))
                .collect(),
        )
    }

    async fn synthetic(
        ctx: &EtlContext,
        scope: &RunScope,
        location: Location,
    ) -> Option<Vec<TimeSeriesPoint>> {
        let profile = match ctx.source.daily_profile(location, scope.date).await {
            Ok(p) => p,
            Err(e) => {
                warn!(%location, error = %e, "day summary fetch failed; skipping location");
                return None;
            }
        };

        let simulator = WeatherSimulator::new(WeatherParams {
            interval: ctx.interval,
            clamp: ctx.profiles.weather.clamp,
        });
        Some(
            scope
                .grid
                .iter()
                .zip(simulator.simulate_day(&profile))
                .map(|(ts, v)| TimeSeriesPoint::new(*ts, v))
                .collect(),
        )
    }
}

#[async_trait]
impl Stage for WeatherStage {
    fn kind(&self) -> StageKind {
        StageKind::Weather
    }

    async fn run(&self, ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError> {
        let entities = ctx.registry.list_entities().await?;
        if entities.is_empty() {
            warn!(date = %scope.date, "no entities registered; nothing to fetch");
            return Ok(0);
        }

        let mut total = 0;
        for location in unique_locations(&entities) {
            let series = match ctx.weather_mode {
                WeatherMode::Observed => Self::observed(ctx, scope, location).await,
                WeatherMode::Synthetic => Self::synthetic(ctx, scope, location).await,
            };
            let Some(series) = series.filter(|s| !s.is_empty()) else {
                warn!(%location, mode = %ctx.weather_mode, "no temperatures for day; skipping location");
                continue;
            };

            let rows = ctx
                .store
                .upsert_bulk(SeriesKey::Temperature(location.key()), &series)
                .await?;
            info!(%location, rows, mode = %ctx.weather_mode, "upserted temperatures");
            total += rows;
        }

        require_rows(self.kind(), scope, entities.len(), total)
    }
}
