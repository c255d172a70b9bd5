use anyhow::Result;
use chrono::NaiveDate;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::{Entity, Interval};
use crate::etl::WeatherMode;
use crate::simulation::SimulatorProfiles;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub openweather: OpenWeatherConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub simulators: SimulatorProfiles,
    #[serde(default)]
    pub customers: Vec<Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub backfill_start_date: NaiveDate,
    #[serde(default)]
    pub interval: Interval,
    pub every_minutes: u64,
    #[serde(default = "default_true")]
    pub run_backfill: bool,
    #[serde(default)]
    pub weather_mode: WeatherMode,
}

impl PipelineConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.every_minutes * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenWeatherConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub max_retries: u32,
    pub units: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    10
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("ZENDO__").split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.every_minutes == 0 {
            anyhow::bail!("pipeline.every_minutes must be positive");
        }
        self.simulators.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const DEFAULT_TOML: &str = r#"
        [pipeline]
        backfill_start_date = "2024-06-01"
        interval = "15m"
        every_minutes = 15

        [openweather]
        base_url = "https://api.openweathermap.org"
        timeout_seconds = 10
        max_retries = 3
        units = "metric"

        [simulators.solar]
        installed_capacity_kw = 250.0

        [[simulators.overrides]]
        entity_id = 2
        datacenter = { it_load_kw = 400.0 }

        [[customers]]
        id = 1
        name = "Big Ben"
        location = { latitude = 50.5, longitude = 0.1 }
    "#;

    #[test]
    fn test_load_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/default.toml", DEFAULT_TOML)?;
            jail.set_env("ZENDO__PIPELINE__EVERY_MINUTES", "5");
            jail.set_env("ZENDO__OPENWEATHER__API_KEY", "secret");

            let cfg = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(cfg.pipeline.every_minutes, 5);
            assert_eq!(cfg.pipeline.period(), Duration::from_secs(300));
            assert_eq!(cfg.pipeline.interval, Interval::FifteenMinutes);
            assert_eq!(cfg.pipeline.weather_mode, WeatherMode::Observed);
            assert!(cfg.pipeline.run_backfill);
            assert_eq!(cfg.openweather.api_key.as_deref(), Some("secret"));
            assert_eq!(cfg.db.url, None);
            assert_eq!(cfg.simulators.solar.installed_capacity_kw, 250.0);
            assert_eq!(cfg.simulators.datacenter_for(2).it_load_kw, 400.0);
            assert_eq!(cfg.customers.len(), 1);
            assert_eq!(cfg.customers[0].location.latitude, 50.5);
            Ok(())
        });
    }

    #[test]
    fn test_zero_period_rejected() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/default.toml", DEFAULT_TOML)?;
            jail.set_env("ZENDO__PIPELINE__EVERY_MINUTES", "0");
            assert!(Config::load().is_err());
            Ok(())
        });
    }
}
