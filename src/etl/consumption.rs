use async_trait::async_trait;
use chrono::Duration;
use tracing::{info, warn};

use super::{load_grid, require_rows, EtlContext, RunScope, Stage, StageError, StageKind};
use crate::domain::{midnight, Entity, SeriesKey, TimeSeriesPoint};
use crate::repo::StoreError;
use crate::series::dense_values;
use crate::simulation::DatacenterSimulator;

/// Simulates datacenter load per entity from the stored temperature grid
pub struct ConsumptionStage;

impl ConsumptionStage {
    /// Last temperature before midnight, carrying the thermal lag across days
    async fn prior_temperature(
        ctx: &EtlContext,
        scope: &RunScope,
        entity: &Entity,
    ) -> Result<Option<f64>, StoreError> {
        let end = midnight(scope.date);
        let previous = ctx
            .store
            .get_series(
                SeriesKey::Temperature(entity.location.key()),
                end - Duration::days(1),
                end,
            )
            .await?;
        Ok(previous.last().map(|p| p.value))
    }
}

#[async_trait]
impl Stage for ConsumptionStage {
    fn kind(&self) -> StageKind {
        StageKind::Consumption
    }

    async fn run(&self, ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError> {
        let entities = ctx.registry.list_entities().await?;
        info!(date = %scope.date, entities = entities.len(), "simulating consumption");

        let mut total = 0;
        for entity in &entities {
            let grid = load_grid(ctx, SeriesKey::Temperature(entity.location.key()), scope).await?;
            let Some(temperatures) = dense_values(&grid).filter(|t| !t.is_empty()) else {
                warn!(entity = entity.id, location = %entity.location, "no temperature data; skipping entity");
                continue;
            };

            let initial = Self::prior_temperature(ctx, scope, entity).await?;
            let params = ctx
                .profiles
                .datacenter_for(entity.id)
                .with_interval_hours(ctx.interval.hours());
            let loads = DatacenterSimulator::new(params)?.simulate(&temperatures, initial);

            let points: Vec<_> = scope
                .grid
                .iter()
                .zip(&loads)
                .map(|(ts, kw)| TimeSeriesPoint::new(*ts, *kw))
                .collect();
            let rows = ctx
                .store
                .upsert_bulk(SeriesKey::Consumption(entity.id), &points)
                .await?;

            let (min_kw, max_kw) = loads
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
            info!(entity = entity.id, rows, min_kw, max_kw, seeded = initial.is_some(), "upserted consumption");
            total += rows;
        }

        require_rows(self.kind(), scope, entities.len(), total)
    }
}
