//! # Synthetic Weather Simulation
//!
//! Reconstructs an intraday temperature curve from four anchor readings
//! (night 00:00, morning 06:00, afternoon 12:00, evening 18:00) by fitting
//! a single 24 h harmonic:
//!
//! ```text
//! T(t) = a + b·cos(2πt/24) + c·sin(2πt/24)
//! a = mean(night, morning, afternoon, evening)
//! b = (night − afternoon) / 2
//! c = (morning − evening) / 2
//! ```
//!
//! With anchors exactly six hours apart this is the least-squares solution
//! of the overdetermined system, so the curve passes through the anchors
//! whenever they are themselves sinusoidal.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::SimulationError;
use crate::domain::{DailyProfile, Interval, HOURS_IN_DAY};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherParams {
    pub interval: Interval,
    /// Clamp samples into the profile's `[t_min, t_max]` when it has them
    pub clamp: bool,
}

impl Default for WeatherParams {
    fn default() -> Self {
        Self {
            interval: Interval::ThirtyMinutes,
            clamp: true,
        }
    }
}

/// Harmonic coefficients fitted to one [`DailyProfile`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl HarmonicFit {
    pub fn from_profile(profile: &DailyProfile) -> Self {
        Self {
            a: (profile.night + profile.morning + profile.afternoon + profile.evening) / 4.0,
            b: (profile.night - profile.afternoon) / 2.0,
            c: (profile.morning - profile.evening) / 2.0,
        }
    }

    /// Temperature at `hour` hours after midnight
    pub fn evaluate(&self, hour: f64) -> f64 {
        let angle = TAU * hour / HOURS_IN_DAY as f64;
        self.a + self.b * angle.cos() + self.c * angle.sin()
    }
}

#[derive(Debug, Clone)]
pub struct WeatherSimulator {
    params: WeatherParams,
}

impl WeatherSimulator {
    pub fn new(params: WeatherParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WeatherParams {
        &self.params
    }

    pub fn steps_per_day(&self) -> usize {
        (HOURS_IN_DAY as f64 / self.params.interval.hours()).round() as usize
    }

    fn bound(&self, temp: f64, profile: &DailyProfile) -> f64 {
        if !self.params.clamp {
            return temp;
        }
        let temp = profile.t_min.map_or(temp, |lo| temp.max(lo));
        profile.t_max.map_or(temp, |hi| temp.min(hi))
    }

    /// One day of samples starting at midnight
    pub fn simulate_day(&self, profile: &DailyProfile) -> Vec<f64> {
        let fit = HarmonicFit::from_profile(profile);
        let step_hours = self.params.interval.hours();

        (0..self.steps_per_day())
            .map(|i| self.bound(fit.evaluate(i as f64 * step_hours), profile))
            .collect()
    }

    /// Consecutive days concatenated in input order
    pub fn simulate(&self, profiles: &[DailyProfile]) -> Result<Vec<f64>, SimulationError> {
        if profiles.is_empty() {
            return Err(SimulationError::EmptyInput("profiles"));
        }
        Ok(profiles.iter().flat_map(|p| self.simulate_day(p)).collect())
    }
}
