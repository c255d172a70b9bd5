use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use zendo_energy::{config, etl, repo, sources, telemetry};
use config::Config;
use etl::{EtlContext, Pipeline};
use telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    init_tracing();

    let cfg = Config::load()?;
    let repos = repo::Repositories::new(&cfg).await?;
    let source = sources::OpenWeatherClient::new(&cfg.openweather)?;

    let pipeline = Arc::new(Pipeline::new(EtlContext {
        store: repos.store.clone(),
        registry: repos.registry.clone(),
        source: Arc::new(source),
        profiles: Arc::new(cfg.simulators.clone()),
        interval: cfg.pipeline.interval,
        weather_mode: cfg.pipeline.weather_mode,
    }));

    info!(
        interval = %cfg.pipeline.interval,
        weather_mode = %cfg.pipeline.weather_mode,
        every_minutes = cfg.pipeline.every_minutes,
        "starting zendo ETL"
    );

    let shutdown = telemetry::shutdown_token();

    if cfg.pipeline.run_backfill {
        let runs = tokio::select! {
            runs = pipeline.run_backfill(cfg.pipeline.backfill_start_date) => runs,
            _ = shutdown.cancelled() => {
                warn!("shutdown during backfill");
                return Ok(());
            }
        };
        let failed = runs.iter().filter(|r| !r.succeeded()).count();
        info!(days = runs.len(), failed, "backfill complete");
    }

    pipeline.run_periodic(cfg.pipeline.period(), shutdown).await;

    warn!("shutdown complete");
    Ok(())
}
