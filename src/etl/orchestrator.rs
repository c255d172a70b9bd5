//! # Pipeline State Machine
//!
//! ```text
//! Pending -> Irradiance -> Weather -> Consumption -> Production -> Correlation -> Done
//!                 \____________\____________\_____________\______________\-> Failed
//! ```
//!
//! Stages of one date run strictly in sequence. The first failing stage
//! moves the run to `Failed` and every downstream stage is skipped. Runs for
//! different dates share no state, so a failed date never blocks another.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use strum::Display;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{
    ConsumptionStage, CorrelationStage, EtlContext, IrradianceStage, ProductionStage, RunScope,
    Stage, StageError, StageKind, WeatherStage,
};
use crate::domain::days_inclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Irradiance,
    Weather,
    Consumption,
    Production,
    Correlation,
    Done,
    Failed,
}

impl From<StageKind> for PipelineState {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Irradiance => PipelineState::Irradiance,
            StageKind::Weather => PipelineState::Weather,
            StageKind::Consumption => PipelineState::Consumption,
            StageKind::Production => PipelineState::Production,
            StageKind::Correlation => PipelineState::Correlation,
        }
    }
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Completed { rows: usize },
    Failed(StageError),
    /// Not attempted because an upstream stage failed
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub status: StageStatus,
}

/// Record of one orchestration pass; never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub date: NaiveDate,
    pub state: PipelineState,
    pub outcomes: Vec<StageOutcome>,
}

impl PipelineRun {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            state: PipelineState::Pending,
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn failed_stage(&self) -> Option<StageKind> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.status, StageStatus::Failed(_)))
            .map(|o| o.stage)
    }

    pub fn outcome(&self, stage: StageKind) -> Option<&StageStatus> {
        self.outcomes
            .iter()
            .find(|o| o.stage == stage)
            .map(|o| &o.status)
    }

    pub fn rows_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                StageStatus::Completed { rows } => rows,
                _ => 0,
            })
            .sum()
    }
}

/// Sequences the ETL stages for a date
pub struct Pipeline {
    ctx: EtlContext,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(ctx: EtlContext) -> Self {
        Self::with_stages(
            ctx,
            vec![
                Box::new(IrradianceStage),
                Box::new(WeatherStage),
                Box::new(ConsumptionStage),
                Box::new(ProductionStage),
                Box::new(CorrelationStage),
            ],
        )
    }

    /// Stages run in the order given
    pub fn with_stages(ctx: EtlContext, stages: Vec<Box<dyn Stage>>) -> Self {
        Self { ctx, stages }
    }

    pub fn context(&self) -> &EtlContext {
        &self.ctx
    }

    pub async fn run_pipeline(&self, date: NaiveDate) -> PipelineRun {
        self.run_pipeline_at(date, Utc::now()).await
    }

    /// Runs the chain for `date` as seen at `now`
    pub async fn run_pipeline_at(&self, date: NaiveDate, now: DateTime<Utc>) -> PipelineRun {
        let scope = RunScope::new(date, self.ctx.interval, now);
        let mut run = PipelineRun::new(date);
        info!(%date, slots = scope.grid.len(), "starting pipeline run");

        let mut failure = scope.grid.is_empty().then_some(StageError::FutureDate(date));

        for stage in &self.stages {
            let kind = stage.kind();
            let status = if run.state == PipelineState::Failed {
                StageStatus::Skipped
            } else {
                run.state = kind.into();
                let result = match failure.take() {
                    Some(e) => Err(e),
                    None => stage.run(&self.ctx, &scope).await,
                };
                match result {
                    Ok(rows) => {
                        info!(%date, stage = %kind, rows, "stage completed");
                        StageStatus::Completed { rows }
                    }
                    Err(e) => {
                        error!(%date, stage = %kind, error = %e, "stage failed; skipping downstream stages");
                        run.state = PipelineState::Failed;
                        StageStatus::Failed(e)
                    }
                }
            };
            run.outcomes.push(StageOutcome { stage: kind, status });
        }

        if !run.state.is_terminal() {
            run.state = PipelineState::Done;
        }
        info!(%date, state = %run.state, rows = run.rows_written(), "pipeline run finished");
        run
    }

    /// Every day from `start` through today, oldest first
    pub async fn run_backfill(&self, start: NaiveDate) -> Vec<PipelineRun> {
        let now = Utc::now();
        self.run_range(start, now.date_naive(), now).await
    }

    /// Every day in `[start, end]` in order; a failed day does not stop the loop
    pub async fn run_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<PipelineRun> {
        let mut runs = Vec::new();
        for date in days_inclusive(start, end) {
            runs.push(self.run_pipeline_at(date, now).await);
        }

        let failed = runs.iter().filter(|r| !r.succeeded()).count();
        if failed > 0 {
            warn!(%start, %end, days = runs.len(), failed, "backfill finished with failures");
        } else {
            info!(%start, %end, days = runs.len(), "backfill finished");
        }
        runs
    }

    /// Runs today's chain every `period` until `cancel` fires; returns the number of passes
    pub async fn run_periodic(&self, period: Duration, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let run = self.run_pipeline(Utc::now().date_naive()).await;
                    passes += 1;
                    if let Some(stage) = run.failed_stage() {
                        warn!(date = %run.date, %stage, "periodic run failed");
                    }
                }
            }
        }

        info!(passes, "periodic pipeline stopped");
        passes
    }
}
