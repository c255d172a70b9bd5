//! # Energy Simulation Module
//!
//! Pure, synchronous physical models that turn environmental series into
//! energy series.
//!
//! ## Components
//!
//! - **Solar**: GHI irradiance to AC output with NOCT temperature derating
//! - **Datacenter**: ambient temperature to facility load through a dual thermal lag and PUE
//! - **Weather**: four daily anchor temperatures to an intraday harmonic curve
//! - **Jitter**: reproducible hash-derived perturbation shared by the models
//!
//! ## Usage
//!
//! ```rust
//! use zendo_energy::simulation::{compute_solar_production, SolarParams};
//!
//! let irradiance = [0.0, 250.0, 800.0, 1000.0];
//! let output = compute_solar_production(&SolarParams::default(), &irradiance, None).unwrap();
//! assert_eq!(output.len(), 4);
//! assert_eq!(output[0], 0.0);
//! ```

pub mod datacenter;
pub mod error;
pub mod jitter;
pub mod profiles;
pub mod solar;
pub mod weather;

pub use datacenter::{DatacenterParams, DatacenterSimulator};
pub use error::SimulationError;
pub use jitter::{jitter, jitter_with_precision, JitterConfig, DEFAULT_PRECISION};
pub use profiles::{EntityProfile, SimulatorProfiles};
pub use solar::{SolarParams, SolarSimulator};
pub use weather::{HarmonicFit, WeatherParams, WeatherSimulator};

use crate::domain::DailyProfile;

/// AC output (kW) for an irradiance series
pub fn compute_solar_production(
    params: &SolarParams,
    irradiance: &[f64],
    temperatures: Option<&[f64]>,
) -> Result<Vec<f64>, SimulationError> {
    SolarSimulator::new(*params)?.simulate(irradiance, temperatures)
}

/// Facility load (kW) for an ambient temperature series
pub fn compute_datacenter_load(
    params: &DatacenterParams,
    temperatures: &[f64],
    initial_temp: Option<f64>,
) -> Result<Vec<f64>, SimulationError> {
    Ok(DatacenterSimulator::new(*params)?.simulate(temperatures, initial_temp))
}

/// Intraday temperatures for consecutive days
pub fn compute_synthetic_temperature(
    params: &WeatherParams,
    profiles: &[DailyProfile],
) -> Result<Vec<f64>, SimulationError> {
    WeatherSimulator::new(*params).simulate(profiles)
}
