use async_trait::async_trait;
use tracing::{info, warn};

use super::{load_grid, require_rows, EtlContext, RunScope, Stage, StageError, StageKind};
use crate::domain::{SeriesKey, TimeSeriesPoint};
use crate::series::dense_values;
use crate::simulation::SolarSimulator;

/// Simulates PV output per entity from the stored irradiance grid
pub struct ProductionStage;

#[async_trait]
impl Stage for ProductionStage {
    fn kind(&self) -> StageKind {
        StageKind::Production
    }

    async fn run(&self, ctx: &EtlContext, scope: &RunScope) -> Result<usize, StageError> {
        let entities = ctx.registry.list_entities().await?;
        info!(date = %scope.date, entities = entities.len(), "simulating production");

        let mut total = 0;
        for entity in &entities {
            let location = entity.location.key();

            let irradiance_grid = load_grid(ctx, SeriesKey::Irradiance(location), scope).await?;
            let Some(irradiance) = dense_values(&irradiance_grid).filter(|v| !v.is_empty()) else {
                warn!(entity = entity.id, location = %entity.location, "no irradiance data; skipping entity");
                continue;
            };

            // temperatures only enable derating
            let temperature_grid = load_grid(ctx, SeriesKey::Temperature(location), scope).await?;
            let temperatures = dense_values(&temperature_grid);
            if temperatures.is_none() {
                warn!(entity = entity.id, "temperature unavailable; temperature derating disabled");
            }

            let simulator = SolarSimulator::new(ctx.profiles.solar_for(entity.id))?;
            let output = simulator.simulate(&irradiance, temperatures.as_deref())?;

            let points: Vec<_> = scope
                .grid
                .iter()
                .zip(output)
                .map(|(ts, kw)| TimeSeriesPoint::new(*ts, kw))
                .collect();
            let rows = ctx
                .store
                .upsert_bulk(SeriesKey::Production(entity.id), &points)
                .await?;
            info!(entity = entity.id, rows, derated = temperatures.is_some(), "upserted production");
            total += rows;
        }

        require_rows(self.kind(), scope, entities.len(), total)
    }
}
