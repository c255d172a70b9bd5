//! Zendo energy pipeline.
//!
//! Ingests solar irradiance and weather for customer sites, simulates
//! datacenter consumption and PV production on a fixed time grid, and
//! computes rolling correlations between the environment and the energy
//! series. See [`etl::Pipeline`] for the daily chain.

pub mod config;
pub mod domain;
pub mod etl;
pub mod repo;
pub mod series;
pub mod service;
pub mod simulation;
pub mod sources;
pub mod telemetry;
