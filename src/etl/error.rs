use chrono::NaiveDate;
use thiserror::Error;

use super::StageKind;
use crate::repo::StoreError;
use crate::simulation::SimulationError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// Entities exist but the stage could not produce a single row
    #[error("{stage} stage produced no rows for {date}")]
    DataGap { stage: StageKind, date: NaiveDate },

    #[error("{0} is in the future")]
    FutureDate(NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
