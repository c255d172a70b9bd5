//! OpenWeatherMap integration
//!
//! Three endpoints feed the pipeline:
//! - `/energy/2.0/solar/interval_data`: intraday irradiance (cloudy-sky GHI)
//! - `/data/3.0/onecall/timemachine`: historical hourly observations
//! - `/data/3.0/onecall/day_summary`: morning/afternoon/evening/night anchors

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{SourceError, WeatherSource};
use crate::config::OpenWeatherConfig;
use crate::domain::{DailyProfile, Interval, Location, TimeSeriesPoint};

/// OpenWeatherMap client with transient-failure retries
pub struct OpenWeatherClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    units: String,
}

impl OpenWeatherClient {
    pub fn new(config: &OpenWeatherConfig) -> Result<Self, SourceError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(SourceError::MissingApiKey)?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            units: config.units.clone(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "requesting OpenWeather");

        let response = self
            .client
            .get(&url)
            .query(&[("appid", self.api_key.as_str()), ("units", self.units.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(%url, "OpenWeather rate limit hit");
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }

    fn location_params(location: Location) -> Vec<(&'static str, String)> {
        vec![
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
        ]
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn solar_irradiance(
        &self,
        location: Location,
        day: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesPoint>, SourceError> {
        let mut params = Self::location_params(location);
        params.push(("date", day.to_string()));
        params.push(("interval", interval.to_string()));

        let response: SolarIntervalResponse =
            self.get("/energy/2.0/solar/interval_data", &params).await?;
        let points = response.into_points()?;

        info!(
            %location,
            %day,
            readings = points.len(),
            "fetched solar irradiance"
        );
        Ok(points)
    }

    async fn hourly_temperature(
        &self,
        location: Location,
        hour: DateTime<Utc>,
    ) -> Result<Option<f64>, SourceError> {
        let mut params = Self::location_params(location);
        params.push(("dt", hour.timestamp().to_string()));

        let response: TimeMachineResponse =
            self.get("/data/3.0/onecall/timemachine", &params).await?;
        Ok(response.data.first().map(|d| d.temp))
    }

    async fn daily_profile(
        &self,
        location: Location,
        day: NaiveDate,
    ) -> Result<DailyProfile, SourceError> {
        let mut params = Self::location_params(location);
        params.push(("date", day.to_string()));

        let response: DaySummaryResponse =
            self.get("/data/3.0/onecall/day_summary", &params).await?;
        let t = response.temperature;
        Ok(DailyProfile::new(t.morning, t.afternoon, t.evening, t.night).with_bounds(t.min, t.max))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.to_string())
}

// OpenWeather response structures
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SolarIntervalResponse {
    date: NaiveDate,
    tz: String,
    #[serde(default)]
    intervals: Vec<SolarInterval>,
}

#[derive(Debug, Deserialize)]
struct SolarInterval {
    start: String,
    avg_irradiance: AvgIrradiance,
}

#[derive(Debug, Deserialize)]
struct AvgIrradiance {
    cloudy_sky: Irradiance,
}

#[derive(Debug, Deserialize)]
struct Irradiance {
    ghi: f64,
}

impl SolarIntervalResponse {
    /// Interval starts are local wall-clock times in the response's offset
    fn into_points(self) -> Result<Vec<TimeSeriesPoint>, SourceError> {
        let offset: FixedOffset = self
            .tz
            .parse()
            .map_err(|_| SourceError::Decode(format!("invalid tz offset `{}`", self.tz)))?;

        self.intervals
            .into_iter()
            .map(|entry| {
                let time = NaiveTime::parse_from_str(&entry.start, "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(&entry.start, "%H:%M"))
                    .map_err(|_| {
                        SourceError::Decode(format!("invalid interval start `{}`", entry.start))
                    })?;
                let local = self
                    .date
                    .and_time(time)
                    .and_local_timezone(offset)
                    .single()
                    .ok_or_else(|| SourceError::Decode(format!("ambiguous time `{}`", entry.start)))?;
                Ok(TimeSeriesPoint::new(
                    local.with_timezone(&Utc),
                    entry.avg_irradiance.cloudy_sky.ghi,
                ))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TimeMachineResponse {
    #[serde(default)]
    data: Vec<TimeMachinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimeMachinePoint {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct DaySummaryResponse {
    temperature: DaySummaryTemperature,
}

#[derive(Debug, Deserialize)]
struct DaySummaryTemperature {
    min: Option<f64>,
    max: Option<f64>,
    morning: f64,
    afternoon: f64,
    evening: f64,
    night: f64,
}
