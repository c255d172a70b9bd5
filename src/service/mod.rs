pub mod summary;

pub use summary::{DailyHistory, EnergySummary, EnergySummaryService, SummaryError};
