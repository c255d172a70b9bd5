//! External weather and solar data.
//!
//! Sources return irregular or hourly data; the ETL stages align it onto the
//! pipeline grid.

pub mod error;
pub mod openweather;

pub use error::SourceError;
pub use openweather::OpenWeatherClient;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{DailyProfile, Interval, Location, TimeSeriesPoint};

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Cloudy-sky GHI (W/m²) for one day at the requested cadence
    async fn solar_irradiance(
        &self,
        location: Location,
        day: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesPoint>, SourceError>;

    /// Observed ambient temperature (°C) for the hour starting at `hour`.
    ///
    /// `Ok(None)` when the provider has no reading for that hour.
    async fn hourly_temperature(
        &self,
        location: Location,
        hour: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError>;

    /// Anchor temperatures summarising one day
    async fn daily_profile(
        &self,
        location: Location,
        day: NaiveDate,
    ) -> Result<DailyProfile, SourceError>;
}
