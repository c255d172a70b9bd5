//! # Solar Production Simulation
//!
//! Converts a GHI irradiance series (W/m²) into AC output (kW) for a PV
//! installation:
//!
//! 1. STC normalisation: `P_dc = P_installed × G / 1000`
//! 2. NOCT cell temperature: `T_cell = T_amb + ΔT × G / 1000`, derating
//!    `f = 1 + γ × (T_cell − 25)`; without temperatures the cells are held at
//!    25 °C and derating is disabled
//! 3. System losses through the performance ratio: `P_ac = P_dc × f × PR`

use serde::{Deserialize, Serialize};

use super::error::ensure;
use super::{JitterConfig, SimulationError};

/// Standard Test Condition irradiance (W/m²)
pub const G_STC: f64 = 1000.0;
/// Cell temperature at Standard Test Condition (°C)
pub const STC_CELL_TEMP_C: f64 = 25.0;

/// PV installation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarParams {
    /// Nameplate DC capacity at STC (kWp)
    pub installed_capacity_kw: f64,
    /// Aggregate inverter, wiring, soiling and clipping losses (0.0-1.0]
    pub performance_ratio: f64,
    /// Power temperature coefficient per °C (crystalline silicon ≈ -0.004)
    pub temp_coefficient: f64,
    /// Cell temperature rise above ambient at 1000 W/m² (°C)
    pub noct_delta_t: f64,
    /// Jitter keyed on the ambient temperature (kW)
    pub jitter: JitterConfig,
}

impl Default for SolarParams {
    fn default() -> Self {
        Self {
            installed_capacity_kw: 500.0,
            performance_ratio: 0.80,
            temp_coefficient: -0.004,
            noct_delta_t: 25.0,
            jitter: JitterConfig::disabled(),
        }
    }
}

impl SolarParams {
    pub fn validate(&self) -> Result<(), SimulationError> {
        ensure(
            self.installed_capacity_kw > 0.0,
            "installed_capacity_kw",
            "must be positive",
        )?;
        ensure(
            self.performance_ratio > 0.0 && self.performance_ratio <= 1.0,
            "performance_ratio",
            "must be in (0, 1]",
        )?;
        Ok(())
    }
}

/// Estimates AC output from irradiance, one value per sample
#[derive(Debug, Clone)]
pub struct SolarSimulator {
    params: SolarParams,
}

impl SolarSimulator {
    pub fn new(params: SolarParams) -> Result<Self, SimulationError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SolarParams {
        &self.params
    }

    fn cell_temperature(&self, ambient_c: f64, ghi: f64) -> f64 {
        ambient_c + self.params.noct_delta_t * (ghi / G_STC)
    }

    /// 1.0 at 25 °C, decreasing linearly above it for a negative coefficient
    pub fn temp_derating(&self, t_cell: f64) -> f64 {
        1.0 + self.params.temp_coefficient * (t_cell - STC_CELL_TEMP_C)
    }

    fn sample(&self, ghi: f64, ambient_c: Option<f64>) -> f64 {
        // sensors report small negatives at night
        let ghi = ghi.max(0.0);
        let p_dc = self.params.installed_capacity_kw * (ghi / G_STC);

        let t_cell = ambient_c.map_or(STC_CELL_TEMP_C, |t| self.cell_temperature(t, ghi));
        let p_ac = (p_dc * self.temp_derating(t_cell) * self.params.performance_ratio).max(0.0);

        match ambient_c {
            Some(t) if p_ac > 0.0 => (p_ac + self.params.jitter.apply(t)).max(0.0),
            _ => p_ac,
        }
    }

    /// AC output (kW) for each irradiance sample.
    ///
    /// `temperatures`, when given, are the concurrent ambient readings (°C)
    /// and must match `irradiance` in length.
    pub fn simulate(
        &self,
        irradiance: &[f64],
        temperatures: Option<&[f64]>,
    ) -> Result<Vec<f64>, SimulationError> {
        match temperatures {
            Some(temps) if temps.len() != irradiance.len() => Err(SimulationError::LengthMismatch {
                expected: irradiance.len(),
                actual: temps.len(),
            }),
            Some(temps) => Ok(irradiance
                .iter()
                .zip(temps)
                .map(|(&ghi, &t)| self.sample(ghi, Some(t)))
                .collect()),
            None => Ok(irradiance.iter().map(|&ghi| self.sample(ghi, None)).collect()),
        }
    }

    /// Output at STC with no derating (kW)
    pub fn peak_output_kw(&self) -> f64 {
        self.params.installed_capacity_kw * self.params.performance_ratio
    }

    /// Mean output as a fraction of installed capacity over the series
    pub fn capacity_factor(
        &self,
        irradiance: &[f64],
        temperatures: Option<&[f64]>,
    ) -> Result<f64, SimulationError> {
        if irradiance.is_empty() {
            return Err(SimulationError::EmptyInput("irradiance"));
        }
        let series = self.simulate(irradiance, temperatures)?;
        let total: f64 = series.iter().sum();
        Ok(total / (self.params.installed_capacity_kw * series.len() as f64))
    }
}
