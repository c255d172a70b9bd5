//! # Datacenter Load Simulation
//!
//! Facility power from ambient temperature through a dual thermal lag:
//! the cooling plant follows ambient with a short time constant while the
//! building's thermal mass follows with a long one. Both lags are
//! exponential moving averages and their blend drives PUE:
//!
//! ```text
//! T_short += min(dt / tau_cooling, 1) * (T_amb - T_short)
//! T_long  += min(dt / tau_mass, 1)    * (T_amb - T_long)
//! T_eff    = alpha * T_short + (1 - alpha) * T_long
//! PUE      = pue_base + pue_temp_coeff * max(0, T_eff - t_setpoint)
//! P        = it_load_kw * utilisation * PUE
//! ```

use serde::{Deserialize, Serialize};

use super::error::ensure;
use super::{JitterConfig, SimulationError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatacenterParams {
    /// Installed IT load (kW)
    pub it_load_kw: f64,
    /// Fraction of IT load actually drawn (0.0-1.0]
    pub utilisation: f64,
    /// PUE in the free-cooling regime (>= 1.0)
    pub pue_base: f64,
    /// PUE increase per °C of effective temperature above the setpoint
    pub pue_temp_coeff: f64,
    /// Free-cooling threshold (°C)
    pub t_setpoint: f64,
    /// Cooling plant response time (hours)
    pub tau_cooling_hours: f64,
    /// Building thermal mass time constant (hours)
    pub tau_mass_hours: f64,
    /// Weight of the short lag in the effective temperature [0.0-1.0]
    pub alpha: f64,
    /// Duration of one input sample (hours)
    pub interval_hours: f64,
    /// Jitter keyed on the ambient temperature (kW)
    pub jitter: JitterConfig,
}

impl Default for DatacenterParams {
    fn default() -> Self {
        Self {
            it_load_kw: 1_000.0,
            utilisation: 0.60,
            pue_base: 1.40,
            pue_temp_coeff: 0.01,
            t_setpoint: 20.0,
            tau_cooling_hours: 1.0,
            tau_mass_hours: 6.0,
            alpha: 0.70,
            interval_hours: 0.25,
            jitter: JitterConfig::disabled(),
        }
    }
}

impl DatacenterParams {
    pub fn validate(&self) -> Result<(), SimulationError> {
        ensure(
            self.utilisation > 0.0 && self.utilisation <= 1.0,
            "utilisation",
            "must be in (0, 1]",
        )?;
        ensure(self.pue_base >= 1.0, "pue_base", "must be >= 1.0")?;
        ensure(
            (0.0..=1.0).contains(&self.alpha),
            "alpha",
            "must be in [0, 1]",
        )?;
        ensure(
            self.tau_cooling_hours > 0.0,
            "tau_cooling_hours",
            "time constants must be positive",
        )?;
        ensure(
            self.tau_mass_hours > 0.0,
            "tau_mass_hours",
            "time constants must be positive",
        )?;
        ensure(self.interval_hours > 0.0, "interval_hours", "must be positive")?;
        Ok(())
    }

    pub fn with_interval_hours(mut self, interval_hours: f64) -> Self {
        self.interval_hours = interval_hours;
        self
    }
}

/// Lag temperatures carried from one sample to the next
#[derive(Debug, Clone, Copy, PartialEq)]
struct LagState {
    short: f64,
    long: f64,
}

impl LagState {
    fn settled(temp: f64) -> Self {
        Self {
            short: temp,
            long: temp,
        }
    }

    fn advance(self, ambient: f64, k_short: f64, k_long: f64) -> Self {
        Self {
            short: self.short + k_short * (ambient - self.short),
            long: self.long + k_long * (ambient - self.long),
        }
    }

    fn effective(&self, alpha: f64) -> f64 {
        alpha * self.short + (1.0 - alpha) * self.long
    }
}

#[derive(Debug, Clone)]
pub struct DatacenterSimulator {
    params: DatacenterParams,
}

impl DatacenterSimulator {
    pub fn new(params: DatacenterParams) -> Result<Self, SimulationError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &DatacenterParams {
        &self.params
    }

    // gains clamp at 1.0 when a time constant is shorter than a step
    fn gain(&self, tau_hours: f64) -> f64 {
        (self.params.interval_hours / tau_hours).min(1.0)
    }

    /// PUE for an effective temperature
    pub fn pue(&self, t_eff: f64) -> f64 {
        self.params.pue_base + self.params.pue_temp_coeff * (t_eff - self.params.t_setpoint).max(0.0)
    }

    /// Active IT draw excluding cooling overhead (kW)
    pub fn it_power_kw(&self) -> f64 {
        self.params.it_load_kw * self.params.utilisation
    }

    pub fn pue_at_setpoint(&self) -> f64 {
        self.params.pue_base
    }

    /// Facility power (kW) per ambient temperature sample.
    ///
    /// Both lags start at `initial_temp` when given, else at the first sample.
    pub fn simulate(&self, temperatures: &[f64], initial_temp: Option<f64>) -> Vec<f64> {
        let Some(&first) = temperatures.first() else {
            return Vec::new();
        };

        let k_short = self.gain(self.params.tau_cooling_hours);
        let k_long = self.gain(self.params.tau_mass_hours);
        let alpha = self.params.alpha;
        let it_power = self.it_power_kw();

        temperatures
            .iter()
            .scan(LagState::settled(initial_temp.unwrap_or(first)), |lag, &ambient| {
                *lag = lag.advance(ambient, k_short, k_long);
                let load = it_power * self.pue(lag.effective(alpha));
                Some(load + self.params.jitter.apply(ambient))
            })
            .collect()
    }

    /// Facility power after unbounded exposure to `temperature`
    pub fn steady_state_load(&self, temperature: f64) -> f64 {
        self.it_power_kw() * self.pue(temperature)
    }
}
