use async_trait::async_trait;
use tracing::{info, warn};

use super::{require_rows, unique_locations, EtlContext, RunScope, Stage, StageError, StageKind};
use crate::domain::{day_window, SeriesKey, TimeSeriesPoint};

/// Fetches one day of cloudy-sky GHI per unique location
pub struct IrradianceStage;

impl IrradianceStage {
    /// Keeps the readings a run may persist.
    ///
    /// Today's readings stop at the current interval; a past day must be
    /// complete or nothing is kept.
    fn accept(
        ctx: &EtlContext,
        scope: &RunScope,
        readings: Vec<TimeSeriesPoint>,
    ) -> Option<Vec<TimeSeriesPoint>> {
        let (start, end) = day_window(scope.date);
        let in_day = readings
            .into_iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end);

        match scope.cutoff(ctx.interval) {
            Some(cutoff) => {
                let trimmed: Vec<_> = in_day.filter(|p| p.timestamp <= cutoff).collect();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            None => {
                let full: Vec<_> = in_day.collect();
                (full.len() == ctx.interval.per_day()).then_some(full)
            }
        }
    }
}

#[async_trait]
impl Stage for IrradianceStage {
    fn kind(&self) -> StageKind {
        StageKind::Irradiance
    }

    async fn run(&self, ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError> {
        let entities = ctx.registry.list_entities().await?;
        if entities.is_empty() {
            warn!(date = %scope.date, "no entities registered; nothing to fetch");
            return Ok(0);
        }

        let mut total = 0;
        for location in unique_locations(&entities) {
            let readings = match ctx
                .source
                .solar_irradiance(location, scope.date, ctx.interval)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(%location, error = %e, "irradiance fetch failed; skipping location");
                    continue;
                }
            };

            let received = readings.len();
            let Some(readings) = Self::accept(ctx, scope, readings) else {
                warn!(
                    %location,
                    received,
                    expected = ctx.interval.per_day(),
                    "incomplete irradiance day; skipping location"
                );
                continue;
            };

            let rows = ctx
                .store
                .upsert_bulk(SeriesKey::Irradiance(location.key()), &readings)
                .await?;
            info!(%location, rows, "upserted irradiance");
            total += rows;
        }

        require_rows(self.kind(), scope, entities.len(), total)
    }
}
