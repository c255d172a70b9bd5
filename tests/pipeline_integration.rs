mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

use common::{context, day, later, sites, CountingStage, FakeWeatherSource};
use zendo_energy::domain::{day_window, Location, SeriesKey};
use zendo_energy::etl::{
    IrradianceStage, Pipeline, PipelineState, ProductionStage, StageError, StageKind, StageStatus,
    WeatherMode,
};
use zendo_energy::repo::{MemoryStore, TimeSeriesStore};
use zendo_energy::simulation::{compute_solar_production, SolarParams};

fn big_ben() -> Location {
    Location::new(50.5, 0.1)
}

fn setup(mode: WeatherMode) -> (Arc<MemoryStore>, Arc<FakeWeatherSource>, Pipeline) {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeWeatherSource::new());
    let pipeline = Pipeline::new(context(store.clone(), source.clone(), sites(), mode));
    (store, source, pipeline)
}

#[tokio::test]
async fn test_full_day_runs_every_stage() {
    let (store, source, pipeline) = setup(WeatherMode::Observed);

    let run = pipeline.run_pipeline_at(day(1), later()).await;

    assert_eq!(run.state, PipelineState::Done);
    assert!(run.succeeded());
    let stages: Vec<StageKind> = run.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(stages, StageKind::iter().collect::<Vec<_>>());
    assert_eq!(run.outcome(StageKind::Irradiance), Some(&StageStatus::Completed { rows: 192 }));
    assert_eq!(run.outcome(StageKind::Weather), Some(&StageStatus::Completed { rows: 192 }));
    assert_eq!(run.outcome(StageKind::Consumption), Some(&StageStatus::Completed { rows: 288 }));
    assert_eq!(run.outcome(StageKind::Production), Some(&StageStatus::Completed { rows: 288 }));
    assert_eq!(run.outcome(StageKind::Correlation), Some(&StageStatus::Completed { rows: 288 }));

    // one fetch per unique site
    assert_eq!(source.irradiance_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.temperature_calls.load(Ordering::SeqCst), 48);

    for id in [1, 2, 3] {
        assert_eq!(store.len(&SeriesKey::Consumption(id)), 96);
        assert_eq!(store.len(&SeriesKey::Production(id)), 96);
        assert_eq!(store.correlation_count(id), 96);
    }
}

#[tokio::test]
async fn test_correlation_rows_cover_day() {
    let (store, _source, pipeline) = setup(WeatherMode::Observed);
    pipeline.run_pipeline_at(day(1), later()).await;

    let (start, end) = day_window(day(1));
    let pairs = store.get_correlations(1, start, end).await.unwrap();
    assert_eq!(pairs.len(), 96);
    assert_eq!(pairs[0].timestamp, start);

    // nothing stored for the previous day: a single paired sample
    assert_eq!(pairs[0].irradiance_vs_production, None);

    let last = pairs[95];
    assert!(last.irradiance_vs_production.unwrap() > 0.9);
    assert!(last.temperature_vs_consumption.is_some());
}

#[tokio::test]
async fn test_irradiance_failure_skips_downstream() {
    let (store, source, pipeline) = setup(WeatherMode::Observed);
    source.fail_irradiance_on(day(1));

    let run = pipeline.run_pipeline_at(day(1), later()).await;

    assert_eq!(run.state, PipelineState::Failed);
    assert_eq!(run.failed_stage(), Some(StageKind::Irradiance));
    assert!(matches!(
        run.outcome(StageKind::Irradiance),
        Some(StageStatus::Failed(StageError::DataGap { stage: StageKind::Irradiance, .. }))
    ));
    for stage in [
        StageKind::Weather,
        StageKind::Consumption,
        StageKind::Production,
        StageKind::Correlation,
    ] {
        assert_eq!(run.outcome(stage), Some(&StageStatus::Skipped));
    }
    assert_eq!(source.temperature_calls.load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_stage_never_invokes_later_stages() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeWeatherSource::new());
    let counters: Vec<Arc<AtomicUsize>> = StageKind::iter().map(|_| Arc::default()).collect();
    let stages = StageKind::iter()
        .zip(&counters)
        .map(|(kind, calls)| CountingStage::boxed(kind, calls.clone(), kind == StageKind::Consumption))
        .collect();
    let pipeline = Pipeline::with_stages(context(store, source, sites(), WeatherMode::Observed), stages);

    let run = pipeline.run_pipeline_at(day(1), later()).await;

    assert_eq!(run.failed_stage(), Some(StageKind::Consumption));
    let calls: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
    assert_eq!(calls, vec![1, 1, 1, 0, 0]);
}

#[tokio::test]
async fn test_backfill_continues_past_failed_day() {
    let (store, source, pipeline) = setup(WeatherMode::Observed);
    source.fail_irradiance_on(day(2));

    let runs = pipeline.run_range(day(1), day(3), later()).await;

    assert_eq!(runs.len(), 3);
    assert_eq!(runs.iter().map(|r| r.date).collect::<Vec<_>>(), vec![day(1), day(2), day(3)]);
    assert!(runs[0].succeeded());
    assert_eq!(runs[1].failed_stage(), Some(StageKind::Irradiance));
    assert!(runs[2].succeeded());

    let (start, end) = day_window(day(2));
    assert!(store
        .get_series(SeriesKey::Consumption(1), start, end)
        .await
        .unwrap()
        .is_empty());
    let (start, end) = day_window(day(3));
    assert_eq!(
        store
            .get_series(SeriesKey::Consumption(1), start, end)
            .await
            .unwrap()
            .len(),
        96
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (store, _source, pipeline) = setup(WeatherMode::Observed);
    let (start, end) = day_window(day(1));

    pipeline.run_pipeline_at(day(1), later()).await;
    let consumption = store.get_series(SeriesKey::Consumption(3), start, end).await.unwrap();
    let correlations = store.get_correlations(3, start, end).await.unwrap();

    let again = pipeline.run_pipeline_at(day(1), later()).await;
    assert!(again.succeeded());
    assert_eq!(store.len(&SeriesKey::Consumption(3)), 96);
    assert_eq!(
        store.get_series(SeriesKey::Consumption(3), start, end).await.unwrap(),
        consumption
    );
    assert_eq!(store.get_correlations(3, start, end).await.unwrap(), correlations);
}

#[tokio::test]
async fn test_today_stops_at_current_interval() {
    let (store, _source, pipeline) = setup(WeatherMode::Observed);
    let now = Utc.with_ymd_and_hms(2024, 6, 5, 10, 40, 0).unwrap();

    let run = pipeline.run_pipeline_at(day(5), now).await;

    assert!(run.succeeded());
    assert_eq!(store.len(&SeriesKey::Irradiance(big_ben().key())), 43);
    assert_eq!(store.len(&SeriesKey::Temperature(big_ben().key())), 43);
    assert_eq!(store.len(&SeriesKey::Consumption(1)), 43);
    assert_eq!(store.len(&SeriesKey::Production(1)), 43);
    assert_eq!(
        store.last_timestamp(SeriesKey::Production(1)).await.unwrap(),
        Some(Utc.with_ymd_and_hms(2024, 6, 5, 10, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_today_correlations_cover_whole_day() {
    let (store, _source, pipeline) = setup(WeatherMode::Observed);
    let now = Utc.with_ymd_and_hms(2024, 6, 5, 10, 40, 0).unwrap();

    let run = pipeline.run_pipeline_at(day(5), now).await;

    assert!(run.succeeded());
    assert_eq!(run.outcome(StageKind::Correlation), Some(&StageStatus::Completed { rows: 288 }));
    let (start, end) = day_window(day(5));
    let pairs = store.get_correlations(1, start, end).await.unwrap();
    assert_eq!(pairs.len(), 96);
    assert_eq!(pairs[0].timestamp, start);
    assert_eq!(
        pairs[95].timestamp,
        Utc.with_ymd_and_hms(2024, 6, 5, 23, 45, 0).unwrap()
    );
}

#[tokio::test]
async fn test_future_date_fails_without_fetching() {
    let (store, source, pipeline) = setup(WeatherMode::Observed);
    let now = Utc.with_ymd_and_hms(2024, 6, 5, 10, 40, 0).unwrap();

    let run = pipeline.run_pipeline_at(day(6), now).await;

    assert_eq!(run.state, PipelineState::Failed);
    assert_eq!(
        run.outcome(StageKind::Irradiance),
        Some(&StageStatus::Failed(StageError::FutureDate(day(6))))
    );
    assert_eq!(source.irradiance_calls.load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_no_entities_is_not_a_failure() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeWeatherSource::new());
    let pipeline = Pipeline::new(context(store.clone(), source, Vec::new(), WeatherMode::Observed));

    let run = pipeline.run_pipeline_at(day(1), later()).await;

    assert!(run.succeeded());
    assert_eq!(run.rows_written(), 0);
}

#[tokio::test]
async fn test_missing_hours_are_interpolated() {
    let (store, source, pipeline) = setup(WeatherMode::Observed);
    source.drop_hours(&[3, 4]);

    assert!(pipeline.run_pipeline_at(day(1), later()).await.succeeded());

    let key = SeriesKey::Temperature(big_ben().key());
    let (start, end) = day_window(day(1));
    let temps = store.get_series(key, start, end).await.unwrap();
    assert_eq!(temps.len(), 96);

    // 02:45 carries hour 2, 05:00 carries hour 5; 04:00 is the fifth of eight filled slots
    let left = FakeWeatherSource::temperature_at(2);
    let right = FakeWeatherSource::temperature_at(5);
    let expected = left + 5.0 * (right - left) / 9.0;
    assert!((temps[16].value - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_synthetic_weather_mode() {
    let (store, source, pipeline) = setup(WeatherMode::Synthetic);

    assert!(pipeline.run_pipeline_at(day(1), later()).await.succeeded());

    assert_eq!(source.profile_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.temperature_calls.load(Ordering::SeqCst), 0);
    let (start, end) = day_window(day(1));
    let temps = store
        .get_series(SeriesKey::Temperature(big_ben().key()), start, end)
        .await
        .unwrap();
    assert_eq!(temps.len(), 96);
    assert!(temps.iter().all(|p| (9.0..=19.0).contains(&p.value)));
}

#[tokio::test]
async fn test_production_without_temperature_disables_derating() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeWeatherSource::new());
    let pipeline = Pipeline::with_stages(
        context(store.clone(), source, sites(), WeatherMode::Observed),
        vec![Box::new(IrradianceStage), Box::new(ProductionStage)],
    );

    assert!(pipeline.run_pipeline_at(day(1), later()).await.succeeded());

    let (start, end) = day_window(day(1));
    let ghi: Vec<f64> = store
        .get_series(SeriesKey::Irradiance(big_ben().key()), start, end)
        .await
        .unwrap()
        .iter()
        .map(|p| p.value)
        .collect();
    let expected = compute_solar_production(&SolarParams::default(), &ghi, None).unwrap();
    let produced: Vec<f64> = store
        .get_series(SeriesKey::Production(1), start, end)
        .await
        .unwrap()
        .iter()
        .map(|p| p.value)
        .collect();
    assert_eq!(produced, expected);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_runs_until_cancelled() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeWeatherSource::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let stages = StageKind::iter()
        .map(|kind| CountingStage::boxed(kind, calls.clone(), false))
        .collect();
    let pipeline = Arc::new(Pipeline::with_stages(
        context(store, source, sites(), WeatherMode::Observed),
        stages,
    ));
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let pipeline = pipeline.clone();
        let token = token.clone();
        async move { pipeline.run_periodic(Duration::from_secs(15 * 60), token).await }
    });

    tokio::time::sleep(Duration::from_secs(31 * 60)).await;
    token.cancel();

    assert_eq!(handle.await.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 15);
}
