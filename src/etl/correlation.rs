use async_trait::async_trait;
use tracing::{info, warn};

use super::{require_rows, EtlContext, RunScope, Stage, StageError, StageKind};
use crate::domain::{timestamps_for_day, Entity, SeriesKey};
use crate::repo::StoreError;
use crate::series::{compute_correlations, correlation_fetch_window, index_series, CorrelationInputs};

/// Rolling 24 h correlations per entity, one row per slot
pub struct CorrelationStage;

impl CorrelationStage {
    async fn inputs(
        ctx: &EtlContext,
        scope: &RunScope,
        entity: &Entity,
    ) -> Result<CorrelationInputs, StoreError> {
        let (start, end) = correlation_fetch_window(scope.date);
        let location = entity.location.key();
        let fetch = |key| ctx.store.get_series(key, start, end);

        Ok(CorrelationInputs {
            irradiance: index_series(&fetch(SeriesKey::Irradiance(location)).await?),
            production: index_series(&fetch(SeriesKey::Production(entity.id)).await?),
            temperature: index_series(&fetch(SeriesKey::Temperature(location)).await?),
            consumption: index_series(&fetch(SeriesKey::Consumption(entity.id)).await?),
        })
    }
}

#[async_trait]
impl Stage for CorrelationStage {
    fn kind(&self) -> StageKind {
        StageKind::Correlation
    }

    async fn run(&self, ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError> {
        let entities = ctx.registry.list_entities().await?;
        info!(date = %scope.date, entities = entities.len(), "computing correlations");

        // every slot of the day, including ones past today's cutoff
        let grid = timestamps_for_day(scope.date, ctx.interval);
        let mut total = 0;
        for entity in &entities {
            let inputs = Self::inputs(ctx, scope, entity).await?;
            if inputs.lacks_sources() {
                warn!(entity = entity.id, "no environmental series stored; skipping entity");
                continue;
            }

            let pairs = compute_correlations(&grid, &inputs);
            let rows = ctx.store.upsert_correlations(entity.id, &pairs).await?;
            let defined = pairs
                .iter()
                .filter(|p| p.irradiance_vs_production.is_some() || p.temperature_vs_consumption.is_some())
                .count();
            info!(entity = entity.id, rows, defined, "upserted correlations");
            total += rows;
        }

        require_rows(self.kind(), scope, entities.len(), total)
    }
}
